use std::rc::Rc;

use ash::vk;
use itertools::Itertools;
use lumen_gfx::{
    GfxResult, VkResultExt,
    capability::{AcquireOutcome, DrawRecorder, FrameBackend, GfxFactory, GpuAllocator, PresentOutcome},
    commands::{
        barrier::GfxImageBarrier, command_buffer::GfxCommandBuffer, command_pool::GfxCommandPool, fence::GfxFence,
        semaphore::GfxSemaphore, submit_info::GfxSubmitInfo,
    },
    foundation::device::GfxDevice,
    gfx::Gfx,
    resources::image::{GfxImage, GfxImageDesc},
    swapchain::{render_swapchain::GfxRenderSwapchain, surface::GfxSurface},
};

/// 交换链、深度附件以及每帧使用的 command pool
///
/// 实现了 [`FrameBackend`]，由 [`crate::frame_scheduler::FrameScheduler`] 驱动
pub struct RenderPresent {
    swapchain: GfxRenderSwapchain,
    swapchain_image_views: Vec<vk::ImageView>,

    depth_image: GfxImage,
    depth_view: vk::ImageView,

    /// 带有 RESET_COMMAND_BUFFER，每个 frame slot 的 command buffer 都从这里分配
    command_pool: GfxCommandPool,
    clear_color: [f32; 4],

    queue: vk::Queue,
    device: Rc<GfxDevice>,
}

// new & init
impl RenderPresent {
    pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

    pub fn new(
        gfx: &Gfx,
        surface: &GfxSurface,
        preferred_present_mode: vk::PresentModeKHR,
        window_extent: vk::Extent2D,
        clear_color: [f32; 4],
    ) -> GfxResult<Self> {
        let device = gfx.gfx_device().clone();
        let swapchain = GfxRenderSwapchain::new(device.clone(), surface, preferred_present_mode, window_extent)?;
        let swapchain_image_views = Self::create_swapchain_image_views(&device, &swapchain)?;
        let (depth_image, depth_view) = Self::create_depth(gfx, swapchain.extent())?;

        let command_pool = GfxCommandPool::new(
            device.clone(),
            gfx.physical_device().gfx_queue_family().clone(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            "render-present",
        )?;

        Ok(Self {
            swapchain,
            swapchain_image_views,
            depth_image,
            depth_view,
            command_pool,
            clear_color,
            queue: gfx.gfx_queue(),
            device,
        })
    }

    fn create_swapchain_image_views(
        device: &GfxDevice,
        swapchain: &GfxRenderSwapchain,
    ) -> GfxResult<Vec<vk::ImageView>> {
        swapchain
            .images()
            .iter()
            .enumerate()
            .map(|(image_index, image)| {
                let create_info = vk::ImageViewCreateInfo::default()
                    .image(*image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(swapchain.color_format())
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                let view = unsafe { device.create_image_view(&create_info, None).gfx_op("vkCreateImageView")? };
                device.set_object_debug_name(view, format!("ImageView::swapchain-{image_index}"));
                Ok(view)
            })
            .collect()
    }

    fn create_depth(gfx: &Gfx, extent: vk::Extent2D) -> GfxResult<(GfxImage, vk::ImageView)> {
        let depth_image = gfx.create_image(&GfxImageDesc::depth_attachment(extent, Self::DEPTH_FORMAT), "depth")?;
        match gfx.create_image_view(&depth_image, "depth") {
            Ok(view) => Ok((depth_image, view)),
            Err(e) => {
                gfx.destroy_image(depth_image);
                Err(e)
            }
        }
    }
}

// getters
impl RenderPresent {
    #[inline]
    pub fn color_format(&self) -> vk::Format {
        self.swapchain.color_format()
    }

    #[inline]
    pub fn depth_format(&self) -> vk::Format {
        Self::DEPTH_FORMAT
    }
}

// update
impl RenderPresent {
    /// 窗口尺寸变化或者交换链失效之后重建交换链和深度附件
    ///
    /// 调用前需要等待 GPU 空闲
    pub fn rebuild(&mut self, gfx: &Gfx, surface: &GfxSurface, window_extent: vk::Extent2D) -> GfxResult<()> {
        self.destroy_swapchain_image_views();
        self.swapchain.rebuild(surface, window_extent)?;
        self.swapchain_image_views = Self::create_swapchain_image_views(&self.device, &self.swapchain)?;

        // 深度附件跟随交换链的尺寸
        if self.depth_image.extent() != self.swapchain.extent() {
            let (depth_image, depth_view) = Self::create_depth(gfx, self.swapchain.extent())?;
            let old_image = std::mem::replace(&mut self.depth_image, depth_image);
            let old_view = std::mem::replace(&mut self.depth_view, depth_view);
            gfx.destroy_image_view(old_view);
            gfx.destroy_image(old_image);
        }
        Ok(())
    }

    fn destroy_swapchain_image_views(&mut self) {
        for view in self.swapchain_image_views.drain(..) {
            unsafe { self.device.destroy_image_view(view, None) };
        }
    }
}

// destroy
impl RenderPresent {
    /// 调用前需要等待 GPU 空闲，并且所有从这里分配的 command buffer 都已经释放
    pub fn destroy(mut self, gfx: &Gfx) {
        self.destroy_swapchain_image_views();
        let Self {
            swapchain,
            depth_image,
            depth_view,
            command_pool,
            ..
        } = self;
        gfx.destroy_image_view(depth_view);
        gfx.destroy_image(depth_image);
        command_pool.destroy();
        swapchain.destroy();
        log::info!("render present destroyed");
    }
}

impl FrameBackend for RenderPresent {
    type Fence = GfxFence;
    type Semaphore = GfxSemaphore;
    type CommandBuffer = GfxCommandBuffer;

    fn create_fence(&self, signaled: bool, name: &str) -> GfxResult<GfxFence> {
        GfxFence::new(self.device.clone(), signaled, name)
    }

    fn create_semaphore(&self, name: &str) -> GfxResult<GfxSemaphore> {
        GfxSemaphore::new(self.device.clone(), name)
    }

    fn allocate_command_buffer(&self, name: &str) -> GfxResult<GfxCommandBuffer> {
        GfxCommandBuffer::new(&self.command_pool, name)
    }

    fn destroy_fence(&self, fence: GfxFence) {
        fence.destroy();
    }

    fn destroy_semaphore(&self, semaphore: GfxSemaphore) {
        semaphore.destroy();
    }

    fn free_command_buffer(&self, command_buffer: GfxCommandBuffer) {
        command_buffer.free();
    }

    fn wait_fence(&self, fence: &GfxFence) -> GfxResult<()> {
        fence.wait()
    }

    fn reset_fence(&self, fence: &GfxFence) -> GfxResult<()> {
        fence.reset()
    }

    fn acquire_next_image(&mut self, signal: &GfxSemaphore) -> GfxResult<AcquireOutcome> {
        self.swapchain.acquire_next_image(signal.handle())
    }

    fn begin_commands(&self, command_buffer: &GfxCommandBuffer, label: &str) -> GfxResult<()> {
        command_buffer.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, label)
    }

    fn begin_rendering(&self, command_buffer: &GfxCommandBuffer, image_index: u32) {
        let swapchain_image = self.swapchain.images()[image_index as usize];
        command_buffer.image_memory_barrier(
            vk::DependencyFlags::empty(),
            &[
                // 不关心交换链图像之前的内容，bottom 表示等待 present
                GfxImageBarrier::new()
                    .image(swapchain_image)
                    .image_aspect_flag(vk::ImageAspectFlags::COLOR)
                    .layout_transfer(vk::ImageLayout::UNDEFINED, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .src_mask(vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::empty())
                    .dst_mask(
                        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                        vk::AccessFlags2::COLOR_ATTACHMENT_WRITE | vk::AccessFlags2::COLOR_ATTACHMENT_READ,
                    ),
                // 深度附件被所有 slot 共享，需要等待上一帧的深度写入
                GfxImageBarrier::new()
                    .image(self.depth_image.vk_image())
                    .image_aspect_flag(vk::ImageAspectFlags::DEPTH)
                    .layout_transfer(vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                    .src_mask(
                        vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
                        vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    )
                    .dst_mask(
                        vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
                        vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ
                            | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    ),
            ],
        );

        let extent = self.swapchain.extent();
        let color_attachments = [vk::RenderingAttachmentInfo::default()
            .image_view(self.swapchain_image_views[image_index as usize])
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            })];
        let depth_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.depth_view)
            .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            });
        let render_area = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent,
        };
        let rendering_info = vk::RenderingInfo::default()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(&color_attachments)
            .depth_attachment(&depth_attachment);
        command_buffer.cmd_begin_rendering(&rendering_info);

        command_buffer.set_viewport(vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        command_buffer.set_scissor(render_area);
    }

    fn end_rendering(&self, command_buffer: &GfxCommandBuffer, image_index: u32) {
        command_buffer.cmd_end_rendering();
        command_buffer.image_memory_barrier(
            vk::DependencyFlags::empty(),
            &[GfxImageBarrier::new()
                .image(self.swapchain.images()[image_index as usize])
                .image_aspect_flag(vk::ImageAspectFlags::COLOR)
                .layout_transfer(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR)
                .src_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
                .dst_mask(vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::empty())],
        );
    }

    fn end_commands(&self, command_buffer: &GfxCommandBuffer) -> GfxResult<()> {
        command_buffer.end()
    }

    fn submit(
        &self,
        command_buffer: &GfxCommandBuffer,
        wait: &GfxSemaphore,
        wait_stage: vk::PipelineStageFlags2,
        signal: &GfxSemaphore,
        fence: &GfxFence,
    ) -> GfxResult<()> {
        let submit_info = GfxSubmitInfo::new(&[command_buffer.vk_handle()])
            .wait(wait.handle(), wait_stage)
            .signal(signal.handle(), vk::PipelineStageFlags2::ALL_COMMANDS);
        unsafe {
            self.device
                .queue_submit2(self.queue, &[submit_info.submit_info()], fence.handle())
                .gfx_op("vkQueueSubmit2")
        }
    }

    fn present(&mut self, image_index: u32, wait: &GfxSemaphore) -> GfxResult<PresentOutcome> {
        self.swapchain.present_image(self.queue, image_index, wait.handle())
    }

    fn render_extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    fn wait_idle(&self) -> GfxResult<()> {
        self.device.wait_idle()
    }
}

/// 设置中的 present mode 对应的 vulkan 枚举
pub fn present_mode_from_setting(setting: lumen_crate_tools::settings::PresentModeSetting) -> vk::PresentModeKHR {
    use lumen_crate_tools::settings::PresentModeSetting;
    match setting {
        PresentModeSetting::Fifo => vk::PresentModeKHR::FIFO,
        PresentModeSetting::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentModeSetting::Immediate => vk::PresentModeKHR::IMMEDIATE,
    }
}
