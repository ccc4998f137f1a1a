use std::path::{Path, PathBuf};

use lumen_crate_tools::resource::LumenPath;

/// 当前项目的环境路径，基于 workspace 根目录
pub struct EnvPath;
impl EnvPath {
    /// glsl 编译器，默认从 PATH 中查找，可以用 `GLSLC` 环境变量覆盖
    pub const GLSLC: &'static str = "glslc";

    /// shader src 的路径
    pub fn shader_src_dir() -> PathBuf {
        LumenPath::shader_root_path().join("src")
    }

    /// 编译 shader 的输出路径
    pub fn shader_build_dir() -> PathBuf {
        LumenPath::shader_root_path().join(".build")
    }

    pub fn glslc() -> PathBuf {
        std::env::var_os("GLSLC").map_or_else(|| PathBuf::from(Self::GLSLC), PathBuf::from)
    }
}

/// 只编译这些后缀的文件
const SHADER_STAGES: [&str; 2] = ["vert", "frag"];

pub fn is_shader_source(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| SHADER_STAGES.contains(&ext))
}

/// `model.vert` -> `.build/model.vert.spv`，和运行时加载的路径保持一致
pub fn spv_output_path(src: &Path) -> Option<PathBuf> {
    let filename = src.file_name()?.to_str()?;
    Some(EnvPath::shader_build_dir().join(format!("{filename}.spv")))
}
