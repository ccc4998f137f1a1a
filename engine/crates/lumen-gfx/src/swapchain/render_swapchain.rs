use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use crate::{
    capability::{AcquireOutcome, PresentOutcome},
    error::{GfxResult, VkResultExt},
    foundation::device::GfxDevice,
    swapchain::surface::GfxSurface,
};

pub struct GfxRenderSwapchain {
    swapchain_handle: vk::SwapchainKHR,

    swapchain_images: Vec<vk::Image>,

    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    swapchain_extent: vk::Extent2D,

    device: Rc<GfxDevice>,
}

// new & init
impl GfxRenderSwapchain {
    /// `preferred_present_mode` 不受支持时使用 FIFO，FIFO 是所有设备都支持的
    pub fn new(
        device: Rc<GfxDevice>,
        surface: &GfxSurface,
        preferred_present_mode: vk::PresentModeKHR,
        window_physical_extent: vk::Extent2D,
    ) -> GfxResult<Self> {
        let surface_format = Self::choose_surface_format(&surface.formats()?);
        let present_mode = Self::choose_present_mode(&surface.present_modes()?, preferred_present_mode);

        let mut swapchain = Self {
            swapchain_handle: vk::SwapchainKHR::null(),
            swapchain_images: vec![],
            surface_format,
            present_mode,
            swapchain_extent: window_physical_extent,
            device,
        };
        swapchain.rebuild(surface, window_physical_extent)?;
        Ok(swapchain)
    }

    /// 根据当前 surface 的状态重新创建交换链，旧的交换链会被销毁
    ///
    /// 调用之前需要确保旧的交换链图像不再被 GPU 使用
    pub fn rebuild(&mut self, surface: &GfxSurface, window_physical_extent: vk::Extent2D) -> GfxResult<()> {
        let surface_capabilities = surface.capabilities()?;

        let extent = Self::calculate_swapchain_extent(&surface_capabilities, window_physical_extent);
        log::info!(
            "create swapchain:
            surface current extent: {}x{}, min extent: {}x{}, max extent: {}x{}
            window physical extent: {}x{}
            final swapchain extent: {}x{}
            present mode: {:?}",
            surface_capabilities.current_extent.width,
            surface_capabilities.current_extent.height,
            surface_capabilities.min_image_extent.width,
            surface_capabilities.min_image_extent.height,
            surface_capabilities.max_image_extent.width,
            surface_capabilities.max_image_extent.height,
            window_physical_extent.width,
            window_physical_extent.height,
            extent.width,
            extent.height,
            self.present_mode,
        );

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle())
            .min_image_count(Self::image_count(&surface_capabilities))
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(surface_capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .clipped(true)
            .old_swapchain(self.swapchain_handle);

        let new_handle =
            unsafe { self.device.swapchain().create_swapchain(&create_info, None).gfx_op("vkCreateSwapchainKHR")? };
        self.destroy_handle();
        self.device.set_object_debug_name(new_handle, "main");

        self.swapchain_handle = new_handle;
        self.swapchain_extent = extent;
        self.swapchain_images = unsafe {
            self.device.swapchain().get_swapchain_images(new_handle).gfx_op("vkGetSwapchainImagesKHR")?
        };
        Ok(())
    }
}

// getters
impl GfxRenderSwapchain {
    #[inline]
    pub fn images(&self) -> &[vk::Image] {
        &self.swapchain_images
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain_extent
    }

    #[inline]
    pub fn color_format(&self) -> vk::Format {
        self.surface_format.format
    }
}

// tools
impl GfxRenderSwapchain {
    /// 确定 window 的 extent 尺寸
    ///
    /// 如果 surface_capabilities.current_extent 包含特殊值 0xFFFFFFFF，则表示可以自己设置交换链的 extent
    pub fn calculate_swapchain_extent(
        surface_capabilities: &vk::SurfaceCapabilitiesKHR,
        window_physical_extent: vk::Extent2D,
    ) -> vk::Extent2D {
        let surface_extent = surface_capabilities.current_extent;
        if surface_extent.width == u32::MAX || surface_extent.height == u32::MAX {
            let width = window_physical_extent
                .width
                .clamp(surface_capabilities.min_image_extent.width, surface_capabilities.max_image_extent.width);
            let height = window_physical_extent
                .height
                .clamp(surface_capabilities.min_image_extent.height, surface_capabilities.max_image_extent.height);
            vk::Extent2D { width, height }
        } else {
            surface_extent
        }
    }

    /// 优先使用 sRGB 格式，保证颜色经过 gamma 校正
    pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
        formats
            .iter()
            .copied()
            .find(|f| {
                f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .or_else(|| formats.first().copied())
            .unwrap_or(vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            })
    }

    pub fn choose_present_mode(
        supported: &[vk::PresentModeKHR],
        preferred: vk::PresentModeKHR,
    ) -> vk::PresentModeKHR {
        if supported.contains(&preferred) {
            preferred
        } else {
            log::warn!("present mode {:?} is not supported, fallback to FIFO", preferred);
            vk::PresentModeKHR::FIFO
        }
    }

    /// max_image_count == 0，表示不限制 image 数量
    fn image_count(surface_capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
        if surface_capabilities.max_image_count == 0 {
            surface_capabilities.min_image_count + 1
        } else {
            u32::min(surface_capabilities.max_image_count, surface_capabilities.min_image_count + 1)
        }
    }
}

// update
impl GfxRenderSwapchain {
    /// 没有超时；OUT_OF_DATE 不被视为错误
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> GfxResult<AcquireOutcome> {
        let result = unsafe {
            self.device.swapchain().acquire_next_image(self.swapchain_handle, u64::MAX, semaphore, vk::Fence::null())
        };

        match result {
            Ok((image_index, suboptimal)) => {
                if suboptimal {
                    log::warn!("swapchain acquire image index {} is not optimal", image_index);
                }
                Ok(AcquireOutcome::Acquired {
                    image_index,
                    suboptimal,
                })
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("swapchain is out of date when acquire next image");
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(e) => Err(e).gfx_op("vkAcquireNextImageKHR"),
        }
    }

    pub fn present_image(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> GfxResult<PresentOutcome> {
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .image_indices(&image_indices)
            .swapchains(std::slice::from_ref(&self.swapchain_handle));

        let result = unsafe { self.device.swapchain().queue_present(queue, &present_info) };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => {
                log::warn!("swapchain present image index {} is not optimal", image_index);
                Ok(PresentOutcome::Suboptimal)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("swapchain is out of date when present image");
                Ok(PresentOutcome::OutOfDate)
            }
            Err(e) => Err(e).gfx_op("vkQueuePresentKHR"),
        }
    }
}

// destroy
impl GfxRenderSwapchain {
    fn destroy_handle(&mut self) {
        if !self.swapchain_handle.is_null() {
            unsafe {
                self.device.swapchain().destroy_swapchain(self.swapchain_handle, None);
            }
            self.swapchain_handle = vk::SwapchainKHR::null();
        }
    }

    pub fn destroy(mut self) {
        self.destroy_handle();
    }
}
impl Drop for GfxRenderSwapchain {
    fn drop(&mut self) {
        debug_assert!(self.swapchain_handle.is_null(), "GfxRenderSwapchain must be destroyed manually");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 2048,
            },
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        }
    }

    #[test]
    fn extent_follows_the_surface_unless_undefined() {
        let window = vk::Extent2D {
            width: 5000,
            height: 600,
        };
        let fixed = GfxRenderSwapchain::calculate_swapchain_extent(&caps((800, 600)), window);
        assert_eq!((fixed.width, fixed.height), (800, 600));

        let free = GfxRenderSwapchain::calculate_swapchain_extent(&caps((u32::MAX, u32::MAX)), window);
        assert_eq!((free.width, free.height), (4096, 600));
    }

    #[test]
    fn present_mode_falls_back_to_fifo() {
        let supported = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(
            GfxRenderSwapchain::choose_present_mode(&supported, vk::PresentModeKHR::IMMEDIATE),
            vk::PresentModeKHR::IMMEDIATE
        );
        assert_eq!(
            GfxRenderSwapchain::choose_present_mode(&supported, vk::PresentModeKHR::MAILBOX),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn srgb_surface_format_is_preferred() {
        let unorm = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let srgb = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        assert_eq!(GfxRenderSwapchain::choose_surface_format(&[unorm, srgb]).format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(GfxRenderSwapchain::choose_surface_format(&[unorm]).format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn one_image_more_than_the_minimum() {
        let mut c = caps((800, 600));
        assert_eq!(GfxRenderSwapchain::image_count(&c), 3);
        c.max_image_count = 2;
        assert_eq!(GfxRenderSwapchain::image_count(&c), 2);
    }
}
