//! 上层依赖的 GPU 能力接口
//!
//! [`crate::gfx::Gfx`] 和渲染层的 present 实现了这些 trait；
//! 测试中使用 mock 实现，不需要真实的 GPU。

mod allocator;
mod factory;
mod frame;
mod recorder;
mod transfer;

pub use allocator::GpuAllocator;
pub use factory::GfxFactory;
pub use frame::{AcquireOutcome, FrameBackend, PresentOutcome};
pub use recorder::DrawRecorder;
pub use transfer::{TransferContext, TransferOp};

/// 模型上传所需的全部能力
pub trait GpuContext: GpuAllocator + TransferContext + GfxFactory {}
impl<T: GpuAllocator + TransferContext + GfxFactory> GpuContext for T {}
