use std::path::{Path, PathBuf};

/// 统一资源路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导）。
///
/// # 使用示例
/// ```ignore
/// let model = LumenPath::assets_path("sponza/sponza.json"); // assets/sponza/sponza.json
/// let shader = LumenPath::shader_build_path("model.vert");   // shader/.build/model.vert.spv
/// ```
pub struct LumenPath {}
// 核心路径
impl LumenPath {
    /// 获取工作区根目录
    pub fn workspace_path() -> PathBuf {
        // 当前 crate 直接位于 workspace 根目录下
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.parent().map_or_else(|| manifest_dir.to_path_buf(), Path::to_path_buf)
    }
}
// 根目录下
impl LumenPath {
    /// 获取 `assets/` 目录下的文件路径
    pub fn assets_path(filename: impl AsRef<Path>) -> PathBuf {
        Self::workspace_path().join("assets").join(filename)
    }

    /// 默认的配置文件：`lumen.toml`
    pub fn settings_path() -> PathBuf {
        Self::workspace_path().join("lumen.toml")
    }

    pub fn shader_root_path() -> PathBuf {
        Self::workspace_path().join("shader")
    }

    /// 获取 `shader/.build/` 目录下的着色器路径（编译后的 SPIR-V）
    ///
    /// `filename` 是源文件名，例如 `model.vert`，返回 `shader/.build/model.vert.spv`
    pub fn shader_build_path(filename: &str) -> PathBuf {
        Self::shader_root_path().join(".build").join(format!("{filename}.spv"))
    }
}
