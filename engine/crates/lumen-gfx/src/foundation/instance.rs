use std::{
    collections::HashSet,
    ffi::{CStr, CString, c_char},
};

use ash::vk;
use itertools::Itertools;

use crate::{
    error::{GfxError, GfxResult, VkResultExt},
    foundation::debug_messenger::GfxDebugMsger,
};

pub struct GfxInstance {
    /// 仅仅是函数指针，以及一个裸的 handle，可以随意 clone
    pub(crate) ash_instance: ash::Instance,
}

// new & init
impl GfxInstance {
    /// 设置所需的 layers 和 extensions，创建 vk instance
    ///
    /// `extra_instance_exts` 通常来自窗口系统，用于创建 surface
    pub fn new(
        vk_entry: &ash::Entry,
        app_name: &str,
        engine_name: &str,
        extra_instance_exts: &[*const c_char],
    ) -> GfxResult<Self> {
        let app_name = CString::new(app_name).map_err(|e| GfxError::InvalidUsage(e.to_string()))?;
        let engine_name = CString::new(engine_name).map_err(|e| GfxError::InvalidUsage(e.to_string()))?;
        let app_info = vk::ApplicationInfo::default()
            .api_version(vk::API_VERSION_1_3) // 版本过低时，有些函数无法正确加载
            .application_name(app_name.as_ref())
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(engine_name.as_ref())
            .engine_version(vk::make_api_version(0, 1, 0, 0));

        let extra_instance_exts = extra_instance_exts.iter().map(|ext| unsafe { CStr::from_ptr(*ext) }).collect_vec();
        let enabled_extensions = Self::get_extensions(vk_entry, &extra_instance_exts)?;
        let enabled_extensions_str =
            enabled_extensions.iter().map(|ext| format!("\n\t{:?}", unsafe { CStr::from_ptr(*ext) })).join("");
        log::info!("instance extensions: {}", enabled_extensions_str);

        let mut instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&enabled_extensions);

        // 为 instance info 添加 debug messenger，用于捕获 create/destroy instance 期间的消息
        let mut debug_utils_messenger_ci = GfxDebugMsger::debug_utils_messenger_ci();
        instance_ci = instance_ci.push_next(&mut debug_utils_messenger_ci);

        let handle = unsafe { vk_entry.create_instance(&instance_ci, None).gfx_op("vkCreateInstance")? };

        Ok(Self { ash_instance: handle })
    }
}

// getters
impl GfxInstance {
    #[inline]
    pub fn ash_instance(&self) -> &ash::Instance {
        &self.ash_instance
    }

    #[inline]
    pub fn vk_instance(&self) -> vk::Instance {
        self.ash_instance.handle()
    }
}

// 构造过程
impl GfxInstance {
    /// instance 所需的，且受支持的 extension
    fn get_extensions(vk_entry: &ash::Entry, extra_instance_exts: &[&CStr]) -> GfxResult<Vec<*const c_char>> {
        let all_ext_props =
            unsafe { vk_entry.enumerate_instance_extension_properties(None).gfx_op("vkEnumerateInstanceExtensionProperties")? };

        let mut enabled_extensions: HashSet<&CStr> = HashSet::new();
        for ext in extra_instance_exts.iter().copied().chain(Self::basic_instance_exts()) {
            let supported = all_ext_props
                .iter()
                .any(|supported_ext| supported_ext.extension_name_as_c_str().is_ok_and(|name| name == ext));
            if !supported {
                return Err(GfxError::MissingSupport {
                    kind: "instance extension",
                    name: ext.to_string_lossy().into_owned(),
                });
            }
            enabled_extensions.insert(ext);
        }

        Ok(enabled_extensions.iter().map(|ext| ext.as_ptr()).collect_vec())
    }

    /// 必须要开启的 instance extensions
    ///
    /// 无需开启 validation layer，使用 vulkan configurator 控制 validation layer 的开启
    fn basic_instance_exts() -> [&'static CStr; 1] {
        [
            // 提供 debug messenger，以及为 vulkan object 设置 debug name
            vk::EXT_DEBUG_UTILS_NAME,
        ]
    }
}

// destroy
impl GfxInstance {
    pub fn destroy(self) {
        log::info!("destroying instance");
        unsafe {
            self.ash_instance.destroy_instance(None);
        }
    }
}
