use ash::vk;

use crate::{
    error::{GfxError, GfxResult, VkResultExt},
    foundation::debug_messenger::DebugType,
};

/// 窗口对应的 surface
///
/// # destroy
/// 需要在 swapchain 销毁之后手动 destroy
pub struct GfxSurface {
    pub(crate) handle: vk::SurfaceKHR,
    pub(crate) pf: ash::khr::surface::Instance,
    pdevice: vk::PhysicalDevice,
}

// new & init
impl GfxSurface {
    /// 由 [`crate::gfx::Gfx::create_surface`] 调用
    ///
    /// gfx queue family 必须支持向这个 surface 呈现
    pub(crate) fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        pdevice: vk::PhysicalDevice,
        gfx_queue_family_index: u32,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> GfxResult<Self> {
        let surface_pf = ash::khr::surface::Instance::new(entry, instance);

        let handle = unsafe {
            ash_window::create_surface(entry, instance, raw_display_handle, raw_window_handle, None)
                .gfx_op("vkCreateSurfaceKHR")?
        };
        let surface = GfxSurface {
            handle,
            pf: surface_pf,
            pdevice,
        };

        let present_supported = unsafe {
            surface
                .pf
                .get_physical_device_surface_support(pdevice, gfx_queue_family_index, handle)
                .gfx_op("vkGetPhysicalDeviceSurfaceSupportKHR")
        };
        match present_supported {
            Ok(true) => Ok(surface),
            Ok(false) => {
                surface.destroy();
                Err(GfxError::NoSuitableDevice("present support on the gfx queue family"))
            }
            Err(e) => {
                surface.destroy();
                Err(e)
            }
        }
    }
}

// getters
impl GfxSurface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// 实时获取，窗口尺寸变化之后会改变
    pub fn capabilities(&self) -> GfxResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.pf
                .get_physical_device_surface_capabilities(self.pdevice, self.handle)
                .gfx_op("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")
        }
    }

    pub fn formats(&self) -> GfxResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.pf
                .get_physical_device_surface_formats(self.pdevice, self.handle)
                .gfx_op("vkGetPhysicalDeviceSurfaceFormatsKHR")
        }
    }

    pub fn present_modes(&self) -> GfxResult<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.pf
                .get_physical_device_surface_present_modes(self.pdevice, self.handle)
                .gfx_op("vkGetPhysicalDeviceSurfacePresentModesKHR")
        }
    }
}

// destroy
impl GfxSurface {
    pub fn destroy(self) {
        log::info!("destroying surface");
        unsafe { self.pf.destroy_surface(self.handle, None) }
    }
}

impl DebugType for GfxSurface {
    fn debug_type_name() -> &'static str {
        "GfxSurface"
    }
    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
