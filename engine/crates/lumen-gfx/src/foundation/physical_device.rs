use ash::vk;
use itertools::Itertools;

use crate::{
    error::{GfxError, GfxResult, VkResultExt},
    foundation::debug_messenger::DebugType,
};

#[derive(Clone, Debug)]
pub struct GfxQueueFamily {
    pub name: String,
    pub queue_family_index: u32,
    pub queue_flags: vk::QueueFlags,
    pub queue_count: u32,
}

/// 表示一张物理显卡
pub struct GfxPhysicalDevice {
    pub(crate) vk_handle: vk::PhysicalDevice,

    /// 当前 gpu 的基础属性
    pub(crate) basic_props: vk::PhysicalDeviceProperties,

    /// 全能的 queue family：graphics, compute, transfer
    pub(crate) gfx_queue_family: GfxQueueFamily,
}

// new & init
impl GfxPhysicalDevice {
    /// 优先选择独立显卡，如果没有则选择第一个可用的显卡
    ///
    /// 没有 graphics queue 的显卡会被忽略
    pub fn new_descrete_physical_device(instance: &ash::Instance) -> GfxResult<Self> {
        let pdevices = unsafe { instance.enumerate_physical_devices().gfx_op("vkEnumeratePhysicalDevices")? };
        pdevices
            .iter()
            .filter_map(|pdevice| Self::new(*pdevice, instance))
            // 优先使用独立显卡
            .find_or_first(GfxPhysicalDevice::is_descrete_gpu)
            .ok_or(GfxError::NoSuitableDevice("graphics | compute | transfer queue family"))
    }

    fn new(pdevice: vk::PhysicalDevice, instance: &ash::Instance) -> Option<Self> {
        let basic_props = unsafe { instance.get_physical_device_properties(pdevice) };
        log::info!("found gpu: {:?}", basic_props.device_name_as_c_str().unwrap_or_default());

        // 找到所有的队列信息并打印出来
        let queue_familiy_props = unsafe { instance.get_physical_device_queue_family_properties(pdevice) };
        log::debug!("physical device: queue family props:\n{:#?}", queue_familiy_props);

        let required_flags = vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER;
        let gfx_queue_family = queue_familiy_props
            .iter()
            .enumerate()
            .find(|(_, props)| props.queue_flags.contains(required_flags))
            .map(|(family_idx, props)| GfxQueueFamily {
                name: "gfx".to_string(),
                queue_family_index: family_idx as u32,
                queue_flags: props.queue_flags,
                queue_count: props.queue_count,
            })?;

        Some(Self {
            vk_handle: pdevice,
            basic_props,
            gfx_queue_family,
        })
    }
}

// getters
impl GfxPhysicalDevice {
    #[inline]
    pub fn vk_handle(&self) -> vk::PhysicalDevice {
        self.vk_handle
    }

    #[inline]
    pub fn gfx_queue_family(&self) -> &GfxQueueFamily {
        &self.gfx_queue_family
    }

    /// 当前 gpu 是否是独立显卡
    #[inline]
    pub fn is_descrete_gpu(&self) -> bool {
        self.basic_props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }

    #[inline]
    pub fn max_sampler_anisotropy(&self) -> f32 {
        self.basic_props.limits.max_sampler_anisotropy
    }
}

impl DebugType for GfxPhysicalDevice {
    fn debug_type_name() -> &'static str {
        "GfxPhysicalDevice"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.vk_handle
    }
}
