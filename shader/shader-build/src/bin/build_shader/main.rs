//! 把 `shader/src` 下的 glsl 编译为 `shader/.build` 下的 SPIR-V
//!
//! 依赖 Vulkan SDK 中的 `glslc`

mod shader_build_config;

use std::{path::Path, process::Command};

use anyhow::{Context, bail};
use lumen_crate_tools::init_log::init_log;

use crate::shader_build_config::{EnvPath, is_shader_source, spv_output_path};

fn compile_one(glslc: &Path, src: &Path) -> anyhow::Result<()> {
    let Some(output) = spv_output_path(src) else {
        bail!("invalid shader file name: {}", src.display());
    };

    let status = Command::new(glslc)
        .arg("--target-env=vulkan1.3")
        .arg(src)
        .arg("-o")
        .arg(&output)
        .status()
        .with_context(|| format!("failed to run {}", glslc.display()))?;
    if !status.success() {
        bail!("glslc failed on {} ({status})", src.display());
    }

    log::info!("{} -> {}", src.display(), output.display());
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let src_dir = EnvPath::shader_src_dir();
    let build_dir = EnvPath::shader_build_dir();
    std::fs::create_dir_all(&build_dir).with_context(|| format!("create {}", build_dir.display()))?;

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(&src_dir).with_context(|| format!("read {}", src_dir.display()))? {
        let path = entry?.path();
        if is_shader_source(&path) {
            sources.push(path);
        }
    }
    sources.sort();

    let glslc = EnvPath::glslc();
    let mut failed = 0;
    for src in &sources {
        if let Err(e) = compile_one(&glslc, src) {
            log::error!("{e:#}");
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{failed} of {} shaders failed to compile", sources.len());
    }
    log::info!("{} shaders compiled", sources.len());
    Ok(())
}

fn main() -> std::process::ExitCode {
    init_log(log::LevelFilter::Info);
    match run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}
