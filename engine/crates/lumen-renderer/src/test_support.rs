//! 测试用的 GPU mock
//!
//! 所有 handle 都是递增的整数，通过 `vk::Handle::from_raw` 构造。
//! buffer 在 host 上有对应的内存，传输操作直接在这些内存之间复制。

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    ptr::NonNull,
};

use ash::vk::{self, Handle};
use lumen_gfx::{
    GfxError, GfxResult,
    capability::{DrawRecorder, GfxFactory, GpuAllocator, TransferContext, TransferOp},
    pipelines::graphics_pipeline::GfxGraphicsPipelineCreateInfo,
    resources::{
        AllocationHandle,
        buffer::{GfxBuffer, MemoryIntent},
        image::{GfxImage, GfxImageDesc},
        sampler::GfxSamplerDesc,
    },
};

#[derive(Default)]
pub struct MockGpu {
    next_handle: Cell<u64>,
    names: RefCell<HashMap<u64, String>>,
    live: RefCell<HashSet<u64>>,
    memory: RefCell<HashMap<u64, Box<[u8]>>>,
    image_contents: RefCell<HashMap<u64, Vec<u8>>>,
    pipelines: RefCell<Vec<GfxGraphicsPipelineCreateInfo>>,
    log: RefCell<Vec<String>>,
    fail_on: Cell<Option<&'static str>>,
}

// tools
impl MockGpu {
    pub fn new() -> Self {
        Self {
            next_handle: Cell::new(1),
            ..Default::default()
        }
    }

    /// 之后名为 `op` 的操作都会返回错误
    pub fn fail_on(&self, op: &'static str) {
        self.fail_on.set(Some(op));
    }

    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// 某条记录第一次出现的位置
    pub fn position(&self, entry: &str) -> usize {
        self.log
            .borrow()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("`{entry}` not in log: {:#?}", self.log.borrow()))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.log.borrow().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn buffer_contents(&self, buffer: &GfxBuffer) -> Vec<u8> {
        self.memory.borrow()[&buffer.vk_buffer().as_raw()].to_vec()
    }

    pub fn image_contents(&self, image: &GfxImage) -> Vec<u8> {
        self.image_contents.borrow()[&image.vk_image().as_raw()].clone()
    }

    pub fn pipelines(&self) -> Vec<GfxGraphicsPipelineCreateInfo> {
        self.pipelines.borrow().clone()
    }

    fn check_fail(&self, op: &'static str) -> GfxResult<()> {
        if self.fail_on.get() == Some(op) {
            return Err(GfxError::GpuOperationFailed {
                op,
                result: vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
            });
        }
        Ok(())
    }

    fn alloc(&self, what: &str, name: &str, tracked: bool) -> u64 {
        let raw = self.next_handle.get();
        self.next_handle.set(raw + 1);
        self.names.borrow_mut().insert(raw, name.to_string());
        if tracked {
            self.live.borrow_mut().insert(raw);
        }
        self.log.borrow_mut().push(format!("{what}:{name}"));
        raw
    }

    fn release(&self, what: &str, raw: u64) {
        assert!(self.live.borrow_mut().remove(&raw), "{what} on dead handle {raw}");
        let name = self.names.borrow()[&raw].clone();
        self.log.borrow_mut().push(format!("{what}:{name}"));
    }

    fn assert_live(&self, raw: u64) {
        assert!(self.live.borrow().contains(&raw), "handle {raw} used after destroy");
    }
}

impl GpuAllocator for MockGpu {
    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        _usage: vk::BufferUsageFlags,
        intent: MemoryIntent,
        name: &str,
    ) -> GfxResult<GfxBuffer> {
        self.check_fail("create_buffer")?;
        if size == 0 {
            return Err(GfxError::InvalidUsage(format!("buffer {name} has zero size")));
        }
        let raw = self.alloc("create_buffer", name, true);
        self.memory.borrow_mut().insert(raw, vec![0u8; size as usize].into_boxed_slice());
        Ok(GfxBuffer::from_parts(vk::Buffer::from_raw(raw), AllocationHandle::default(), size, intent, name))
    }

    fn create_image(&self, desc: &GfxImageDesc, name: &str) -> GfxResult<GfxImage> {
        self.check_fail("create_image")?;
        let raw = self.alloc("create_image", name, true);
        Ok(GfxImage::from_parts(vk::Image::from_raw(raw), AllocationHandle::default(), *desc, name))
    }

    fn map_buffer(&self, buffer: &GfxBuffer) -> GfxResult<NonNull<u8>> {
        if buffer.intent() == MemoryIntent::DeviceLocal {
            return Err(GfxError::InvalidUsage(format!("buffer {} is not host visible", buffer.name())));
        }
        let raw = buffer.vk_buffer().as_raw();
        self.assert_live(raw);
        let mut memory = self.memory.borrow_mut();
        let bytes = memory.get_mut(&raw).unwrap();
        Ok(NonNull::new(bytes.as_mut_ptr()).unwrap())
    }

    fn unmap_buffer(&self, _buffer: &GfxBuffer) {}

    fn flush_buffer(&self, buffer: &GfxBuffer, _offset: vk::DeviceSize, _size: vk::DeviceSize) -> GfxResult<()> {
        self.assert_live(buffer.vk_buffer().as_raw());
        Ok(())
    }

    fn destroy_buffer(&self, buffer: GfxBuffer) {
        let raw = buffer.vk_buffer().as_raw();
        self.release("destroy_buffer", raw);
        self.memory.borrow_mut().remove(&raw);
    }

    fn destroy_image(&self, image: GfxImage) {
        self.release("destroy_image", image.vk_image().as_raw());
    }
}

impl TransferContext for MockGpu {
    fn submit_and_wait(&self, name: &str, ops: &[TransferOp<'_>]) -> GfxResult<()> {
        self.check_fail("submit_and_wait")?;
        self.log.borrow_mut().push(format!("submit_and_wait:{name}"));
        for op in ops {
            match op {
                TransferOp::CopyBuffer { src, dst, size } => {
                    let (src_raw, dst_raw) = (src.vk_buffer().as_raw(), dst.vk_buffer().as_raw());
                    self.assert_live(src_raw);
                    self.assert_live(dst_raw);
                    assert!(*size <= src.size() && *size <= dst.size());
                    let mut memory = self.memory.borrow_mut();
                    let bytes = memory[&src_raw][..*size as usize].to_vec();
                    memory.get_mut(&dst_raw).unwrap()[..*size as usize].copy_from_slice(&bytes);
                }
                TransferOp::UploadImage { src, dst } => {
                    let (src_raw, dst_raw) = (src.vk_buffer().as_raw(), dst.vk_image().as_raw());
                    self.assert_live(src_raw);
                    self.assert_live(dst_raw);
                    let bytes = self.memory.borrow()[&src_raw].to_vec();
                    self.image_contents.borrow_mut().insert(dst_raw, bytes);
                }
            }
        }
        Ok(())
    }
}

impl GfxFactory for MockGpu {
    fn create_image_view(&self, image: &GfxImage, name: &str) -> GfxResult<vk::ImageView> {
        self.assert_live(image.vk_image().as_raw());
        Ok(vk::ImageView::from_raw(self.alloc("create_image_view", name, true)))
    }
    fn destroy_image_view(&self, view: vk::ImageView) {
        self.release("destroy_image_view", view.as_raw());
    }

    fn create_sampler(&self, _desc: &GfxSamplerDesc, name: &str) -> GfxResult<vk::Sampler> {
        Ok(vk::Sampler::from_raw(self.alloc("create_sampler", name, true)))
    }
    fn destroy_sampler(&self, sampler: vk::Sampler) {
        self.release("destroy_sampler", sampler.as_raw());
    }

    fn create_descriptor_set_layout(
        &self,
        _bindings: &[vk::DescriptorSetLayoutBinding<'_>],
        name: &str,
    ) -> GfxResult<vk::DescriptorSetLayout> {
        Ok(vk::DescriptorSetLayout::from_raw(self.alloc("create_descriptor_set_layout", name, true)))
    }
    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.release("destroy_descriptor_set_layout", layout.as_raw());
    }

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
        name: &str,
    ) -> GfxResult<vk::DescriptorPool> {
        let samplers: u32 = pool_sizes.iter().map(|size| size.descriptor_count).sum();
        let raw = self.alloc("create_descriptor_pool", name, true);
        self.log.borrow_mut().push(format!("pool_sizes:{max_sets}:{samplers}"));
        Ok(vk::DescriptorPool::from_raw(raw))
    }
    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        self.release("destroy_descriptor_pool", pool.as_raw());
    }

    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        name: &str,
    ) -> GfxResult<vk::DescriptorSet> {
        self.assert_live(pool.as_raw());
        self.assert_live(layout.as_raw());
        Ok(vk::DescriptorSet::from_raw(self.alloc("allocate_descriptor_set", name, false)))
    }

    fn write_combined_image_sampler(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        view: vk::ImageView,
        sampler: vk::Sampler,
    ) {
        self.assert_live(view.as_raw());
        self.assert_live(sampler.as_raw());
        let set_name = self.names.borrow()[&set.as_raw()].clone();
        let view_name = self.names.borrow()[&view.as_raw()].clone();
        self.log.borrow_mut().push(format!("write_descriptor:{set_name}:{binding}:{view_name}"));
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
        _push_constant_ranges: &[vk::PushConstantRange],
        name: &str,
    ) -> GfxResult<vk::PipelineLayout> {
        set_layouts.iter().for_each(|layout| self.assert_live(layout.as_raw()));
        Ok(vk::PipelineLayout::from_raw(self.alloc("create_pipeline_layout", name, true)))
    }
    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.release("destroy_pipeline_layout", layout.as_raw());
    }

    fn create_graphics_pipeline(
        &self,
        create_info: &GfxGraphicsPipelineCreateInfo,
        layout: vk::PipelineLayout,
        name: &str,
    ) -> GfxResult<vk::Pipeline> {
        self.check_fail("create_graphics_pipeline")?;
        self.assert_live(layout.as_raw());
        self.pipelines.borrow_mut().push(create_info.clone());
        Ok(vk::Pipeline::from_raw(self.alloc("create_graphics_pipeline", name, true)))
    }
    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.release("destroy_pipeline", pipeline.as_raw());
    }
}

/// 录制到 mock command buffer 中的命令
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    BindPipeline(u64),
    Viewport { width: f32, height: f32 },
    Scissor { x: i32, y: i32, width: u32, height: u32 },
    BindVertexBuffer(u64),
    BindIndexBuffer(u64, vk::IndexType),
    BindDescriptorSet { set_index: u32, set: u64 },
    PushConstants { offset: u32, data: Vec<u8> },
    DrawIndexed { index_count: u32, first_index: u32, vertex_offset: i32 },
}

#[derive(Default)]
pub struct MockRecorder {
    pub id: usize,
    calls: RefCell<Vec<DrawCall>>,
}
impl MockRecorder {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            calls: RefCell::default(),
        }
    }

    pub fn calls(&self) -> Vec<DrawCall> {
        self.calls.borrow().clone()
    }

    pub fn draws(&self) -> Vec<(u32, u32, i32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DrawCall::DrawIndexed {
                    index_count,
                    first_index,
                    vertex_offset,
                } => Some((*index_count, *first_index, *vertex_offset)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: DrawCall) {
        self.calls.borrow_mut().push(call);
    }
}
impl DrawRecorder for MockRecorder {
    fn bind_graphics_pipeline(&self, pipeline: vk::Pipeline) {
        self.push(DrawCall::BindPipeline(pipeline.as_raw()));
    }
    fn set_viewport(&self, viewport: vk::Viewport) {
        self.push(DrawCall::Viewport {
            width: viewport.width,
            height: viewport.height,
        });
    }
    fn set_scissor(&self, scissor: vk::Rect2D) {
        self.push(DrawCall::Scissor {
            x: scissor.offset.x,
            y: scissor.offset.y,
            width: scissor.extent.width,
            height: scissor.extent.height,
        });
    }
    fn bind_vertex_buffer(&self, buffer: vk::Buffer, _offset: vk::DeviceSize) {
        self.push(DrawCall::BindVertexBuffer(buffer.as_raw()));
    }
    fn bind_index_buffer(&self, buffer: vk::Buffer, _offset: vk::DeviceSize, index_type: vk::IndexType) {
        self.push(DrawCall::BindIndexBuffer(buffer.as_raw(), index_type));
    }
    fn bind_descriptor_set(&self, _layout: vk::PipelineLayout, set_index: u32, set: vk::DescriptorSet) {
        self.push(DrawCall::BindDescriptorSet {
            set_index,
            set: set.as_raw(),
        });
    }
    fn push_constants(&self, _layout: vk::PipelineLayout, _stages: vk::ShaderStageFlags, offset: u32, data: &[u8]) {
        self.push(DrawCall::PushConstants {
            offset,
            data: data.to_vec(),
        });
    }
    fn draw_indexed(&self, index_count: u32, first_index: u32, vertex_offset: i32) {
        self.push(DrawCall::DrawIndexed {
            index_count,
            first_index,
            vertex_offset,
        });
    }
}
