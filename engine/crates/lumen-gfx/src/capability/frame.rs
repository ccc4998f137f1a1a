use ash::vk;

use crate::{capability::DrawRecorder, error::GfxResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { image_index: u32, suboptimal: bool },
    /// 交换链已经失效，需要重建；semaphore 没有被 signal
    OutOfDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// 已经呈现，但交换链和 surface 不再完全匹配
    Suboptimal,
    OutOfDate,
}

impl PresentOutcome {
    #[inline]
    pub fn need_recreate(self) -> bool {
        self != Self::Presented
    }
}

/// 帧调度所需的同步原语、命令录制和交换链操作
pub trait FrameBackend {
    type Fence;
    type Semaphore;
    type CommandBuffer: DrawRecorder;

    fn create_fence(&self, signaled: bool, name: &str) -> GfxResult<Self::Fence>;
    fn create_semaphore(&self, name: &str) -> GfxResult<Self::Semaphore>;
    fn allocate_command_buffer(&self, name: &str) -> GfxResult<Self::CommandBuffer>;

    fn destroy_fence(&self, fence: Self::Fence);
    fn destroy_semaphore(&self, semaphore: Self::Semaphore);
    fn free_command_buffer(&self, command_buffer: Self::CommandBuffer);

    /// 阻塞等待 fence 被 signal
    fn wait_fence(&self, fence: &Self::Fence) -> GfxResult<()>;
    fn reset_fence(&self, fence: &Self::Fence) -> GfxResult<()>;

    /// 获取下一张交换链图像，图像可用时 signal `signal`
    fn acquire_next_image(&mut self, signal: &Self::Semaphore) -> GfxResult<AcquireOutcome>;

    /// 重置并开始录制 command buffer
    fn begin_commands(&self, command_buffer: &Self::CommandBuffer, label: &str) -> GfxResult<()>;
    /// 将交换链图像转换为 color attachment，开始 dynamic rendering 并清屏
    fn begin_rendering(&self, command_buffer: &Self::CommandBuffer, image_index: u32);
    /// 结束 dynamic rendering，将交换链图像转换为 present layout
    fn end_rendering(&self, command_buffer: &Self::CommandBuffer, image_index: u32);
    fn end_commands(&self, command_buffer: &Self::CommandBuffer) -> GfxResult<()>;

    /// 提交到 graphics queue：在 `wait_stage` 等待 `wait`，完成后 signal `signal` 和 `fence`
    fn submit(
        &self,
        command_buffer: &Self::CommandBuffer,
        wait: &Self::Semaphore,
        wait_stage: vk::PipelineStageFlags2,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> GfxResult<()>;

    fn present(&mut self, image_index: u32, wait: &Self::Semaphore) -> GfxResult<PresentOutcome>;

    /// 交换链的尺寸，用于设置 viewport
    fn render_extent(&self) -> vk::Extent2D;

    fn wait_idle(&self) -> GfxResult<()>;
}
