use std::ptr::NonNull;

use ash::vk;

use crate::{
    error::{GfxError, GfxResult},
    resources::{
        buffer::{GfxBuffer, MemoryIntent},
        image::{GfxImage, GfxImageDesc},
    },
};

/// GPU 内存分配
///
/// 分配出来的 buffer 和 image 必须通过同一个 allocator 销毁
pub trait GpuAllocator {
    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        intent: MemoryIntent,
        name: &str,
    ) -> GfxResult<GfxBuffer>;

    fn create_image(&self, desc: &GfxImageDesc, name: &str) -> GfxResult<GfxImage>;

    /// 返回的指针在 [`GpuAllocator::unmap_buffer`] 之前有效，长度为 `buffer.size()`
    ///
    /// 只有 [`MemoryIntent::Staging`] 和 [`MemoryIntent::HostCoherent`] 的 buffer 可以映射
    fn map_buffer(&self, buffer: &GfxBuffer) -> GfxResult<NonNull<u8>>;

    fn unmap_buffer(&self, buffer: &GfxBuffer);

    fn flush_buffer(&self, buffer: &GfxBuffer, offset: vk::DeviceSize, size: vk::DeviceSize) -> GfxResult<()>;

    fn destroy_buffer(&self, buffer: GfxBuffer);

    fn destroy_image(&self, image: GfxImage);

    /// 映射 buffer，由 `write` 填充内容，然后 flush 并解除映射
    ///
    /// 无论 `write` 是否成功，buffer 都会被解除映射
    fn write_buffer<E, F>(&self, buffer: &GfxBuffer, write: F) -> Result<(), E>
    where
        E: From<GfxError>,
        F: FnOnce(&mut [u8]) -> Result<(), E>,
    {
        let ptr = self.map_buffer(buffer)?;
        // map_buffer 保证了指针在 unmap 之前指向 size 个字节
        let bytes = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), buffer.size() as usize) };
        let written = write(bytes);
        let flushed = if written.is_ok() { self.flush_buffer(buffer, 0, vk::WHOLE_SIZE) } else { Ok(()) };
        self.unmap_buffer(buffer);

        written?;
        flushed?;
        Ok(())
    }
}
