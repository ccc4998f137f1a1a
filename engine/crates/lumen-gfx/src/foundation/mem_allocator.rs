use std::{cell::RefCell, ptr::NonNull};

use ash::vk;
use slotmap::SlotMap;
use vk_mem::Alloc;

use crate::{
    error::{GfxError, GfxResult, VkResultExt},
    resources::{AllocationHandle, buffer::MemoryIntent},
};

/// vma 以及所有由它分配出来的内存
///
/// buffer 和 image 只持有 [`AllocationHandle`]，真正的 `vk_mem::Allocation` 登记在这里。
/// 销毁时如果还有没有释放的内存，会打印出来。
pub struct GfxMemAllocator {
    inner: vk_mem::Allocator,
    allocations: RefCell<SlotMap<AllocationHandle, vk_mem::Allocation>>,
}

// new & init
impl GfxMemAllocator {
    /// vma 需要引用 Instance 以及 Device，因此需要在它们都初始化完成后再初始化 vma，
    /// 并且在销毁 Device 之前销毁
    pub fn new(instance: &ash::Instance, pdevice: vk::PhysicalDevice, device: &ash::Device) -> GfxResult<Self> {
        let mut vma_ci = vk_mem::AllocatorCreateInfo::new(instance, device, pdevice);
        vma_ci.vulkan_api_version = vk::API_VERSION_1_3;

        let vma = unsafe { vk_mem::Allocator::new(vma_ci).gfx_op("vmaCreateAllocator")? };

        Ok(Self {
            inner: vma,
            allocations: RefCell::new(SlotMap::with_key()),
        })
    }

    fn allocation_ci(intent: MemoryIntent) -> vk_mem::AllocationCreateInfo {
        match intent {
            MemoryIntent::Staging => vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::AutoPreferHost,
                flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE,
                ..Default::default()
            },
            MemoryIntent::DeviceLocal => vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::AutoPreferDevice,
                ..Default::default()
            },
            MemoryIntent::HostCoherent => vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::Auto,
                flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE,
                required_flags: vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                ..Default::default()
            },
        }
    }
}

// tools
impl GfxMemAllocator {
    pub fn create_buffer(
        &self,
        buffer_ci: &vk::BufferCreateInfo,
        intent: MemoryIntent,
    ) -> GfxResult<(vk::Buffer, AllocationHandle)> {
        let (buffer, allocation) = unsafe {
            self.inner.create_buffer(buffer_ci, &Self::allocation_ci(intent)).gfx_op("vmaCreateBuffer")?
        };
        Ok((buffer, self.allocations.borrow_mut().insert(allocation)))
    }

    pub fn create_image(&self, image_ci: &vk::ImageCreateInfo) -> GfxResult<(vk::Image, AllocationHandle)> {
        let (image, allocation) = unsafe {
            self.inner
                .create_image(image_ci, &Self::allocation_ci(MemoryIntent::DeviceLocal))
                .gfx_op("vmaCreateImage")?
        };
        Ok((image, self.allocations.borrow_mut().insert(allocation)))
    }

    pub fn map(&self, handle: AllocationHandle) -> GfxResult<NonNull<u8>> {
        let mut allocations = self.allocations.borrow_mut();
        let allocation = allocations.get_mut(handle).ok_or_else(Self::stale_handle)?;
        let ptr = unsafe { self.inner.map_memory(allocation).gfx_op("vmaMapMemory")? };
        NonNull::new(ptr).ok_or_else(|| GfxError::InvalidUsage("vmaMapMemory returned null".to_string()))
    }

    pub fn unmap(&self, handle: AllocationHandle) {
        if let Some(allocation) = self.allocations.borrow_mut().get_mut(handle) {
            unsafe { self.inner.unmap_memory(allocation) };
        }
    }

    pub fn flush(&self, handle: AllocationHandle, offset: vk::DeviceSize, size: vk::DeviceSize) -> GfxResult<()> {
        let allocations = self.allocations.borrow();
        let allocation = allocations.get(handle).ok_or_else(Self::stale_handle)?;
        self.inner.flush_allocation(allocation, offset, size).gfx_op("vmaFlushAllocation")
    }

    pub fn destroy_buffer(&self, buffer: vk::Buffer, handle: AllocationHandle) {
        match self.allocations.borrow_mut().remove(handle) {
            Some(mut allocation) => unsafe { self.inner.destroy_buffer(buffer, &mut allocation) },
            None => log::error!("destroying buffer {:?} with a stale allocation", buffer),
        }
    }

    pub fn destroy_image(&self, image: vk::Image, handle: AllocationHandle) {
        match self.allocations.borrow_mut().remove(handle) {
            Some(mut allocation) => unsafe { self.inner.destroy_image(image, &mut allocation) },
            None => log::error!("destroying image {:?} with a stale allocation", image),
        }
    }

    fn stale_handle() -> GfxError {
        GfxError::InvalidUsage("allocation has already been freed".to_string())
    }
}

// destroy
impl GfxMemAllocator {
    pub fn destroy(self) {
        let mut allocations = self.allocations.into_inner();
        if !allocations.is_empty() {
            log::error!("{} gpu allocations leaked, freeing them with the allocator", allocations.len());
        }
        for (_, mut allocation) in allocations.drain() {
            unsafe { self.inner.free_memory(&mut allocation) };
        }
        log::info!("destroying vma");
        // 通过 drop 触发 vmaDestroyAllocator
        drop(self.inner);
    }
}
