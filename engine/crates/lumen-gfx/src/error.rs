use std::path::PathBuf;

use ash::vk;

/// GFX 层的错误
///
/// 除了 [`GfxError::InvalidUsage`] 之外，都被视为致命错误：调用方记录日志后退出
#[derive(thiserror::Error, Debug)]
pub enum GfxError {
    /// 任意返回非 success 的 Vulkan 调用
    #[error("gpu operation `{op}` failed: {result:?}")]
    GpuOperationFailed { op: &'static str, result: vk::Result },

    #[error("failed to load vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("required {kind} is not supported: {name}")]
    MissingSupport { kind: &'static str, name: String },

    #[error("no physical device satisfies: {0}")]
    NoSuitableDevice(&'static str),

    #[error("failed to read shader {}", path.display())]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// API 的调用方式不对，例如使用了未映射的内存
    #[error("invalid usage: {0}")]
    InvalidUsage(String),
}

pub type GfxResult<T> = Result<T, GfxError>;

/// 将 `Result<T, vk::Result>` 转换为 [`GfxResult`]，附带操作名称
pub trait VkResultExt<T> {
    fn gfx_op(self, op: &'static str) -> GfxResult<T>;
}
impl<T> VkResultExt<T> for Result<T, vk::Result> {
    #[inline]
    fn gfx_op(self, op: &'static str) -> GfxResult<T> {
        self.map_err(|result| GfxError::GpuOperationFailed { op, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gfx_op_names_the_operation() {
        let result: Result<(), vk::Result> = Err(vk::Result::ERROR_DEVICE_LOST);
        let err = result.gfx_op("vkQueueSubmit2").unwrap_err();
        assert!(matches!(
            err,
            GfxError::GpuOperationFailed {
                op: "vkQueueSubmit2",
                result: vk::Result::ERROR_DEVICE_LOST
            }
        ));
        assert!(err.to_string().contains("vkQueueSubmit2"));
    }
}
