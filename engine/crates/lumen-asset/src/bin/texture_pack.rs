//! 将 png / jpeg 转换为 `.ltex` 压缩纹理容器
//!
//! ```text
//! texture-pack assets/sponza/albedo.png            # 输出 assets/sponza/albedo.ltex
//! texture-pack albedo.png -o out/albedo.ltex
//! ```

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use lumen_asset::texture_codec::{CompressedTexture, TEXTURE_EXTENSION};
use lumen_crate_tools::init_log::init_log;

#[derive(Parser, Debug)]
#[command(version, about = "Pack png/jpeg images into compressed .ltex textures")]
struct Args {
    /// 输入图片，可以传多个
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// 输出路径，只在单个输入时可用；缺省时与输入同目录
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_log(log::LevelFilter::Info);
    let args = Args::parse();

    if args.output.is_some() && args.inputs.len() > 1 {
        bail!("--output can only be used with a single input");
    }

    for input in &args.inputs {
        let output = args.output.clone().unwrap_or_else(|| input.with_extension(TEXTURE_EXTENSION));

        let image = image::open(input).with_context(|| format!("failed to decode {}", input.display()))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            bail!("{} has an empty extent", input.display());
        }

        let texture = CompressedTexture::encode(rgba.as_raw(), width, height);
        texture.write_to(&output)?;
    }

    Ok(())
}
