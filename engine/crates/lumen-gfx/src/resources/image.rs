use ash::vk;

use crate::{foundation::debug_messenger::DebugType, resources::AllocationHandle};

/// 创建 2D image 所需的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfxImageDesc {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub usage: vk::ImageUsageFlags,
    pub mip_levels: u32,
}

impl GfxImageDesc {
    /// 用于采样的纹理：包含完整的 mip chain，可以作为 blit 的源和目标
    pub fn sampled_texture(width: u32, height: u32, format: vk::Format) -> Self {
        Self {
            extent: vk::Extent2D { width, height },
            format,
            usage: vk::ImageUsageFlags::SAMPLED
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::TRANSFER_SRC,
            mip_levels: mip_level_count(width, height),
        }
    }

    /// 深度附件，只有一个 mip
    pub fn depth_attachment(extent: vk::Extent2D, format: vk::Format) -> Self {
        Self {
            extent,
            format,
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            mip_levels: 1,
        }
    }

    #[inline]
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        aspect_of(self.format)
    }
}

/// floor(log2(max(width, height))) + 1
#[inline]
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    u32::BITS - width.max(height).max(1).leading_zeros()
}

fn aspect_of(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
            vk::ImageAspectFlags::DEPTH
        }
        vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}

/// 一个 2D vulkan image 和它的内存
///
/// # destroy
/// 必须通过 [`crate::capability::GpuAllocator::destroy_image`] 销毁
#[derive(Debug)]
pub struct GfxImage {
    handle: vk::Image,
    allocation: AllocationHandle,
    desc: GfxImageDesc,
    name: String,
}

// new & init
impl GfxImage {
    pub fn from_parts(
        handle: vk::Image,
        allocation: AllocationHandle,
        desc: GfxImageDesc,
        name: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            allocation,
            desc,
            name: name.into(),
        }
    }
}

// getters
impl GfxImage {
    #[inline]
    pub fn vk_image(&self) -> vk::Image {
        self.handle
    }
    #[inline]
    pub fn allocation(&self) -> AllocationHandle {
        self.allocation
    }
    #[inline]
    pub fn desc(&self) -> &GfxImageDesc {
        &self.desc
    }
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.desc.extent
    }
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.desc.format
    }
    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.desc.mip_levels
    }
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DebugType for GfxImage {
    fn debug_type_name() -> &'static str {
        "GfxImage"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_length() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(4, 4), 3);
        assert_eq!(mip_level_count(1024, 512), 11);
        assert_eq!(mip_level_count(3, 1000), 10);
    }

    #[test]
    fn depth_formats_use_depth_aspect() {
        let depth = GfxImageDesc::depth_attachment(vk::Extent2D { width: 8, height: 8 }, vk::Format::D32_SFLOAT);
        assert_eq!(depth.aspect(), vk::ImageAspectFlags::DEPTH);
        assert_eq!(depth.mip_levels, 1);

        let color = GfxImageDesc::sampled_texture(4, 4, vk::Format::R8G8B8A8_SRGB);
        assert_eq!(color.aspect(), vk::ImageAspectFlags::COLOR);
        assert_eq!(color.mip_levels, 3);
        assert!(color.usage.contains(vk::ImageUsageFlags::TRANSFER_SRC));
    }
}
