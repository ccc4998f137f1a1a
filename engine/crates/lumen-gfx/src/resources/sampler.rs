use ash::vk;

/// 采样器参数
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GfxSamplerDesc {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub address_mode: vk::SamplerAddressMode,
    /// 0 表示不开启各向异性过滤
    pub max_anisotropy: u32,
    pub mipmap_mode: vk::SamplerMipmapMode,
}
impl Default for GfxSamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            max_anisotropy: 0,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
        }
    }
}

impl GfxSamplerDesc {
    /// `device_max_anisotropy` 来自 physical device limits，超过的部分会被截断
    pub fn create_info(&self, device_max_anisotropy: f32) -> vk::SamplerCreateInfo<'static> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(self.mag_filter)
            .min_filter(self.min_filter)
            .address_mode_u(self.address_mode)
            .address_mode_v(self.address_mode)
            .address_mode_w(self.address_mode)
            .mipmap_mode(self.mipmap_mode)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .compare_enable(false);

        if self.max_anisotropy > 0 {
            create_info.anisotropy_enable(true).max_anisotropy((self.max_anisotropy as f32).min(device_max_anisotropy))
        } else {
            create_info.anisotropy_enable(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anisotropy_is_clamped_to_device_limit() {
        let desc = GfxSamplerDesc {
            max_anisotropy: 16,
            ..Default::default()
        };
        let ci = desc.create_info(8.0);
        assert_eq!(ci.anisotropy_enable, vk::TRUE);
        assert_eq!(ci.max_anisotropy, 8.0);

        let ci = GfxSamplerDesc::default().create_info(8.0);
        assert_eq!(ci.anisotropy_enable, vk::FALSE);
        assert_eq!(ci.address_mode_v, vk::SamplerAddressMode::REPEAT);
    }
}
