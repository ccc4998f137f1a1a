use std::ptr::NonNull;

use ash::vk;

use crate::{
    capability::GpuAllocator,
    error::{GfxError, GfxResult},
    gfx::Gfx,
    resources::{
        buffer::{GfxBuffer, MemoryIntent},
        image::{GfxImage, GfxImageDesc},
    },
};

impl GpuAllocator for Gfx {
    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        intent: MemoryIntent,
        name: &str,
    ) -> GfxResult<GfxBuffer> {
        if size == 0 {
            return Err(GfxError::InvalidUsage(format!("buffer {} has zero size", name)));
        }
        let buffer_ci = vk::BufferCreateInfo::default().size(size).usage(usage);
        let (handle, allocation) = self.vm_allocator.create_buffer(&buffer_ci, intent)?;

        let buffer = GfxBuffer::from_parts(handle, allocation, size, intent, name);
        self.device.set_debug_name(&buffer, name);
        Ok(buffer)
    }

    fn create_image(&self, desc: &GfxImageDesc, name: &str) -> GfxResult<GfxImage> {
        let image_ci = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(desc.format)
            .extent(desc.extent.into())
            .mip_levels(desc.mip_levels)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(desc.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let (handle, allocation) = self.vm_allocator.create_image(&image_ci)?;

        let image = GfxImage::from_parts(handle, allocation, *desc, name);
        self.device.set_debug_name(&image, name);
        Ok(image)
    }

    fn map_buffer(&self, buffer: &GfxBuffer) -> GfxResult<NonNull<u8>> {
        if buffer.intent() == MemoryIntent::DeviceLocal {
            return Err(GfxError::InvalidUsage(format!("buffer {} is not host visible", buffer.name())));
        }
        self.vm_allocator.map(buffer.allocation())
    }

    fn unmap_buffer(&self, buffer: &GfxBuffer) {
        self.vm_allocator.unmap(buffer.allocation());
    }

    fn flush_buffer(&self, buffer: &GfxBuffer, offset: vk::DeviceSize, size: vk::DeviceSize) -> GfxResult<()> {
        self.vm_allocator.flush(buffer.allocation(), offset, size)
    }

    fn destroy_buffer(&self, buffer: GfxBuffer) {
        self.vm_allocator.destroy_buffer(buffer.vk_buffer(), buffer.allocation());
    }

    fn destroy_image(&self, image: GfxImage) {
        self.vm_allocator.destroy_image(image.vk_image(), image.allocation());
    }
}
