use std::{
    ffi::CStr,
    path::{Path, PathBuf},
};

use ash::vk;

use crate::{
    error::{GfxError, GfxResult, VkResultExt},
    foundation::{debug_messenger::DebugType, device::GfxDevice},
};

/// # Destroy
///
/// 需要手动调用 `destroy` 方法来释放资源。
pub struct GfxShaderModule {
    handle: vk::ShaderModule,
    destroyed: bool,
}
impl GfxShaderModule {
    /// # param
    /// * path - spv shader 文件路径
    pub fn new(device: &GfxDevice, path: &Path) -> GfxResult<Self> {
        let shader_load_err = |source| GfxError::ShaderLoad {
            path: path.to_path_buf(),
            source,
        };
        let mut file = std::fs::File::open(path).map_err(shader_load_err)?;
        let shader_code = ash::util::read_spv(&mut file).map_err(shader_load_err)?;

        let shader_module_info = vk::ShaderModuleCreateInfo::default().code(&shader_code);
        let handle =
            unsafe { device.create_shader_module(&shader_module_info, None).gfx_op("vkCreateShaderModule")? };

        let shader_module = Self {
            handle,
            destroyed: false,
        };
        device.set_debug_name(&shader_module, path.to_string_lossy());
        Ok(shader_module)
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.handle
    }

    #[inline]
    pub fn destroy(mut self, device: &GfxDevice) {
        unsafe {
            device.destroy_shader_module(self.handle, None);
        }
        self.destroyed = true;
    }
}
impl Drop for GfxShaderModule {
    fn drop(&mut self) {
        debug_assert!(self.destroyed, "ShaderModule must be destroyed manually before drop.");
    }
}
impl DebugType for GfxShaderModule {
    fn debug_type_name() -> &'static str {
        "GfxShaderModule"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

#[derive(Clone, Debug)]
pub struct ShaderStageInfo {
    pub stage: vk::ShaderStageFlags,
    pub entry_point: &'static CStr,
    pub path: PathBuf,
}
