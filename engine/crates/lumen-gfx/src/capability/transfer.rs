use ash::vk;

use crate::{
    error::GfxResult,
    resources::{buffer::GfxBuffer, image::GfxImage},
};

/// 一次传输提交中的单个操作
#[derive(Debug, Clone, Copy)]
pub enum TransferOp<'a> {
    /// 从 `src` 的起始位置复制 `size` 个字节到 `dst` 的起始位置
    CopyBuffer {
        src: &'a GfxBuffer,
        dst: &'a GfxBuffer,
        size: vk::DeviceSize,
    },
    /// 将 `src` 中紧密排列的像素复制到 `dst` 的 mip 0，
    /// 用 blit 生成剩余的 mip，最后所有 mip 都处于 SHADER_READ_ONLY_OPTIMAL
    UploadImage { src: &'a GfxBuffer, dst: &'a GfxImage },
}

/// 同步的传输队列
pub trait TransferContext {
    /// 录制所有操作到一个 command buffer，提交并阻塞等待完成
    ///
    /// 返回之后，`ops` 中引用的 staging buffer 就可以安全销毁了
    fn submit_and_wait(&self, name: &str, ops: &[TransferOp<'_>]) -> GfxResult<()>;
}
