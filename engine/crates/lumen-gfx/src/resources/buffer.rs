use ash::vk;

use crate::{foundation::debug_messenger::DebugType, resources::AllocationHandle};

/// buffer 的内存用途，决定了内存所在的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryIntent {
    /// host 可见，只写一次，用于上传
    Staging,
    /// 只有 GPU 可以访问
    DeviceLocal,
    /// host 可见且 coherent，每帧由 CPU 写入
    HostCoherent,
}

/// 一个 vulkan buffer 和它的内存
///
/// # destroy
/// 必须通过 [`crate::capability::GpuAllocator::destroy_buffer`] 销毁
#[derive(Debug)]
pub struct GfxBuffer {
    handle: vk::Buffer,
    allocation: AllocationHandle,
    size: vk::DeviceSize,
    intent: MemoryIntent,
    name: String,
}

// new & init
impl GfxBuffer {
    /// 由 allocator 调用，将 handle 和内存组装起来
    pub fn from_parts(
        handle: vk::Buffer,
        allocation: AllocationHandle,
        size: vk::DeviceSize,
        intent: MemoryIntent,
        name: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            allocation,
            size,
            intent,
            name: name.into(),
        }
    }
}

// getters
impl GfxBuffer {
    #[inline]
    pub fn vk_buffer(&self) -> vk::Buffer {
        self.handle
    }
    #[inline]
    pub fn allocation(&self) -> AllocationHandle {
        self.allocation
    }
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
    #[inline]
    pub fn intent(&self) -> MemoryIntent {
        self.intent
    }
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DebugType for GfxBuffer {
    fn debug_type_name() -> &'static str {
        "GfxBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
