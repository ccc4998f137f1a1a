//! Vulkan 上下文
//!
//! 持有实例、设备、队列和内存分配器。所有需要 GPU 的操作都显式接收 `&Gfx`，
//! 生命周期由调用方控制：先销毁所有资源，最后调用 [`Gfx::destroy`]。

mod allocator;
mod factory;
mod transfer;

use std::{ffi::c_char, rc::Rc};

use ash::vk;

use crate::{
    commands::{
        command_buffer::GfxCommandBuffer, command_pool::GfxCommandPool, fence::GfxFence,
        submit_info::GfxSubmitInfo,
    },
    error::{GfxResult, VkResultExt},
    foundation::{
        debug_messenger::GfxDebugMsger, device::GfxDevice, instance::GfxInstance, mem_allocator::GfxMemAllocator,
        physical_device::GfxPhysicalDevice,
    },
    swapchain::surface::GfxSurface,
};

pub struct Gfx {
    /// 需要在 instance 之后 drop
    vk_entry: ash::Entry,
    instance: GfxInstance,
    debug_msger: GfxDebugMsger,
    physical_device: GfxPhysicalDevice,
    device: Rc<GfxDevice>,

    gfx_queue: vk::Queue,
    vm_allocator: GfxMemAllocator,

    /// 临时的 graphics command pool，用于一次性的传输命令
    temp_graphics_command_pool: GfxCommandPool,
}

// new & init
impl Gfx {
    const ENGINE_NAME: &'static str = "Lumen";

    /// `instance_extra_exts` 是窗口系统创建 surface 所需的 instance extension，
    /// 通常来自 `ash_window::enumerate_required_extensions`
    pub fn new(app_name: &str, instance_extra_exts: &[*const c_char]) -> GfxResult<Self> {
        let _span = tracy_client::span!("Gfx::new");

        let vk_entry = unsafe { ash::Entry::load()? };
        let instance = GfxInstance::new(&vk_entry, app_name, Self::ENGINE_NAME, instance_extra_exts)?;
        let debug_msger = GfxDebugMsger::new(&vk_entry, instance.ash_instance())?;
        let physical_device = GfxPhysicalDevice::new_descrete_physical_device(instance.ash_instance())?;

        let gfx_family = physical_device.gfx_queue_family().clone();
        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(gfx_family.queue_family_index)
            .queue_priorities(&queue_priorities)];
        let device = Rc::new(GfxDevice::new(instance.ash_instance(), physical_device.vk_handle(), &queue_create_infos)?);

        let gfx_queue = unsafe { device.get_device_queue(gfx_family.queue_family_index, 0) };
        device.set_object_debug_name(gfx_queue, "gfx");

        let vm_allocator = GfxMemAllocator::new(instance.ash_instance(), physical_device.vk_handle(), &device)?;
        let temp_graphics_command_pool = GfxCommandPool::new(
            device.clone(),
            gfx_family,
            vk::CommandPoolCreateFlags::TRANSIENT,
            "gfx-temp",
        )?;

        Ok(Self {
            vk_entry,
            instance,
            debug_msger,
            physical_device,
            device,
            gfx_queue,
            vm_allocator,
            temp_graphics_command_pool,
        })
    }

    pub fn create_surface(
        &self,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> GfxResult<GfxSurface> {
        let surface = GfxSurface::new(
            &self.vk_entry,
            self.instance.ash_instance(),
            self.physical_device.vk_handle(),
            self.physical_device.gfx_queue_family().queue_family_index,
            raw_display_handle,
            raw_window_handle,
        )?;
        self.device.set_debug_name(&surface, "main");
        Ok(surface)
    }
}

// getters
impl Gfx {
    #[inline]
    pub fn gfx_device(&self) -> &Rc<GfxDevice> {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> &GfxPhysicalDevice {
        &self.physical_device
    }

    #[inline]
    pub fn gfx_queue(&self) -> vk::Queue {
        self.gfx_queue
    }
}

// tools
impl Gfx {
    /// 根据给定的格式，返回支持的格式
    pub fn find_supported_format(
        &self,
        candidates: &[vk::Format],
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> Vec<vk::Format> {
        candidates
            .iter()
            .filter(|f| {
                let props = unsafe {
                    self.instance
                        .ash_instance()
                        .get_physical_device_format_properties(self.physical_device.vk_handle(), **f)
                };
                match tiling {
                    vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
                    vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
                    _ => false,
                }
            })
            .copied()
            .collect()
    }

    /// 立即执行某个 command，并同步等待执行结果
    pub fn one_time_exec<F>(&self, name: &str, func: F) -> GfxResult<()>
    where
        F: FnOnce(&GfxCommandBuffer) -> GfxResult<()>,
    {
        let command_buffer = GfxCommandBuffer::new(&self.temp_graphics_command_pool, &format!("one-time-{}", name))?;
        let fence = GfxFence::new(self.device.clone(), false, &format!("one-time-{}", name))?;

        let result = (|| {
            command_buffer.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, name)?;
            func(&command_buffer)?;
            command_buffer.end()?;

            let submit_info = GfxSubmitInfo::new(&[command_buffer.vk_handle()]);
            unsafe {
                self.device
                    .queue_submit2(self.gfx_queue, &[submit_info.submit_info()], fence.handle())
                    .gfx_op("vkQueueSubmit2")?;
            }
            fence.wait()
        })();

        fence.destroy();
        command_buffer.free();
        result
    }

    #[inline]
    pub fn wait_idle(&self) -> GfxResult<()> {
        self.device.wait_idle()
    }
}

// destroy
impl Gfx {
    /// 需要在所有资源都销毁之后调用
    pub fn destroy(self) {
        let Self {
            vk_entry,
            instance,
            debug_msger,
            physical_device: _,
            device,
            gfx_queue: _,
            vm_allocator,
            temp_graphics_command_pool,
        } = self;

        if let Err(e) = device.wait_idle() {
            log::error!("wait idle before destroying gfx: {}", e);
        }
        vm_allocator.destroy();
        temp_graphics_command_pool.destroy();
        device.destroy();
        debug_msger.destroy();
        instance.destroy();
        drop(vk_entry);
    }
}
