use std::{ffi::CString, rc::Rc};

use ash::vk;
use itertools::Itertools;

use crate::{
    capability::DrawRecorder,
    commands::{barrier::GfxImageBarrier, command_pool::GfxCommandPool},
    error::{GfxResult, VkResultExt},
    foundation::{debug_messenger::DebugType, device::GfxDevice},
};

/// 命令缓冲封装
///
/// ```ignore
/// let cmd = GfxCommandBuffer::new(&pool, "my-pass")?;
/// cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, "my-pass")?;
/// cmd.bind_graphics_pipeline(pipeline);
/// // 绘制命令...
/// cmd.end()?;
/// ```
pub struct GfxCommandBuffer {
    vk_handle: vk::CommandBuffer,
    command_pool_handle: vk::CommandPool,
    device: Rc<GfxDevice>,
}

// new & init
impl GfxCommandBuffer {
    pub fn new(command_pool: &GfxCommandPool, debug_name: &str) -> GfxResult<Self> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool.handle())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let device = command_pool.device().clone();
        let command_buffers =
            unsafe { device.allocate_command_buffers(&info).gfx_op("vkAllocateCommandBuffers")? };
        let cmd_buffer = GfxCommandBuffer {
            vk_handle: command_buffers[0],
            command_pool_handle: command_pool.handle(),
            device,
        };
        cmd_buffer.device.set_debug_name(&cmd_buffer, debug_name);
        Ok(cmd_buffer)
    }

    /// 归还给 command pool
    pub fn free(self) {
        unsafe {
            self.device.free_command_buffers(self.command_pool_handle, &[self.vk_handle]);
        }
    }
}

// Basic 命令
impl GfxCommandBuffer {
    /// 开始录制 command，自动设置 debug label
    ///
    /// command pool 需要带有 RESET_COMMAND_BUFFER 才能重复录制
    pub fn begin(&self, usage_flag: vk::CommandBufferUsageFlags, debug_label_name: &str) -> GfxResult<()> {
        unsafe {
            self.device
                .reset_command_buffer(self.vk_handle, vk::CommandBufferResetFlags::empty())
                .gfx_op("vkResetCommandBuffer")?;
            self.device
                .begin_command_buffer(self.vk_handle, &vk::CommandBufferBeginInfo::default().flags(usage_flag))
                .gfx_op("vkBeginCommandBuffer")?;
        }
        self.begin_label(debug_label_name);
        Ok(())
    }

    /// 结束录制 command，结束 debug label
    pub fn end(&self) -> GfxResult<()> {
        self.end_label();
        unsafe { self.device.end_command_buffer(self.vk_handle).gfx_op("vkEndCommandBuffer") }
    }

    fn begin_label(&self, label_name: &str) {
        let Ok(name) = CString::new(label_name) else {
            return;
        };
        unsafe {
            self.device.debug_utils().cmd_begin_debug_utils_label(
                self.vk_handle,
                &vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color([0.8, 0.8, 0.2, 1.0]),
            );
        }
    }

    fn end_label(&self) {
        unsafe {
            self.device.debug_utils().cmd_end_debug_utils_label(self.vk_handle);
        }
    }
}

// getters
impl GfxCommandBuffer {
    #[inline]
    pub fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }
}

// 数据传输类型
impl GfxCommandBuffer {
    /// - command type: action
    /// - 支持的 queue：transfer，graphics，compute
    #[inline]
    pub fn cmd_copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        unsafe {
            self.device.cmd_copy_buffer(self.vk_handle, src, dst, regions);
        }
    }

    /// - command type: action
    /// - 支持的 queue：transfer，graphics，compute
    #[inline]
    pub fn cmd_copy_buffer_to_image(&self, copy_info: &vk::CopyBufferToImageInfo2) {
        unsafe { self.device.cmd_copy_buffer_to_image2(self.vk_handle, copy_info) }
    }

    /// - command type: action
    /// - 支持的 queue：graphics
    #[inline]
    pub fn cmd_blit_image(&self, blit_info: &vk::BlitImageInfo2) {
        unsafe { self.device.cmd_blit_image2(self.vk_handle, blit_info) }
    }
}

// 同步命令
impl GfxCommandBuffer {
    pub fn image_memory_barrier(&self, dependency_flags: vk::DependencyFlags, barriers: &[GfxImageBarrier]) {
        let barriers = barriers.iter().map(|b| *b.inner()).collect_vec();
        let dependency_info =
            vk::DependencyInfo::default().image_memory_barriers(&barriers).dependency_flags(dependency_flags);
        unsafe {
            self.device.cmd_pipeline_barrier2(self.vk_handle, &dependency_info);
        }
    }
}

// 绘制类型的命令
impl GfxCommandBuffer {
    /// - command type: action, state
    /// - supported queue types: graphics
    #[inline]
    pub fn cmd_begin_rendering(&self, render_info: &vk::RenderingInfo) {
        unsafe {
            self.device.cmd_begin_rendering(self.vk_handle, render_info);
        }
    }

    /// - command type: action, state
    /// - supported queue types: graphics
    #[inline]
    pub fn cmd_end_rendering(&self) {
        unsafe {
            self.device.cmd_end_rendering(self.vk_handle);
        }
    }
}

impl DrawRecorder for GfxCommandBuffer {
    #[inline]
    fn bind_graphics_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe {
            self.device.cmd_bind_pipeline(self.vk_handle, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    #[inline]
    fn set_viewport(&self, viewport: vk::Viewport) {
        unsafe {
            self.device.cmd_set_viewport(self.vk_handle, 0, std::slice::from_ref(&viewport));
        }
    }

    #[inline]
    fn set_scissor(&self, scissor: vk::Rect2D) {
        unsafe {
            self.device.cmd_set_scissor(self.vk_handle, 0, std::slice::from_ref(&scissor));
        }
    }

    #[inline]
    fn bind_vertex_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize) {
        unsafe {
            self.device.cmd_bind_vertex_buffers(self.vk_handle, 0, &[buffer], &[offset]);
        }
    }

    #[inline]
    fn bind_index_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        unsafe {
            self.device.cmd_bind_index_buffer(self.vk_handle, buffer, offset, index_type);
        }
    }

    #[inline]
    fn bind_descriptor_set(&self, layout: vk::PipelineLayout, set_index: u32, set: vk::DescriptorSet) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.vk_handle,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                set_index,
                &[set],
                &[],
            );
        }
    }

    #[inline]
    fn push_constants(&self, layout: vk::PipelineLayout, stages: vk::ShaderStageFlags, offset: u32, data: &[u8]) {
        unsafe {
            self.device.cmd_push_constants(self.vk_handle, layout, stages, offset, data);
        }
    }

    #[inline]
    fn draw_indexed(&self, index_count: u32, first_index: u32, vertex_offset: i32) {
        unsafe {
            self.device.cmd_draw_indexed(self.vk_handle, index_count, 1, first_index, vertex_offset, 0);
        }
    }
}

impl DebugType for GfxCommandBuffer {
    fn debug_type_name() -> &'static str {
        "GfxCommandBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.vk_handle
    }
}
