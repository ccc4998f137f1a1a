use std::path::Path;

use ash::vk;
use lumen_asset::texture_codec::CompressedTexture;
use lumen_gfx::{
    GfxError, GfxResult,
    capability::{GfxFactory, GpuAllocator, TransferContext, TransferOp},
    resources::{
        buffer::{GfxBuffer, MemoryIntent},
        image::{GfxImage, GfxImageDesc},
    },
};

use crate::error::ModelError;

/// 纹理统一使用的格式，codec 中的像素总是 RGBA8
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// 上传到 GPU 的纹理
#[derive(Debug)]
pub struct UploadedTexture {
    pub image: GfxImage,
    pub view: vk::ImageView,
}

/// 通过 staging buffer 将 `bytes` 上传到一个 device local 的 buffer
///
/// staging buffer 在传输完成（fence signal）之后才销毁
pub fn upload_buffer<C>(ctx: &C, bytes: &[u8], usage: vk::BufferUsageFlags, name: &str) -> GfxResult<GfxBuffer>
where
    C: GpuAllocator + TransferContext,
{
    let size = bytes.len() as vk::DeviceSize;
    let staging = ctx.create_buffer(
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryIntent::Staging,
        &format!("{name}-staging"),
    )?;

    let uploaded = ctx
        .write_buffer(&staging, |dst| {
            dst[..bytes.len()].copy_from_slice(bytes);
            Ok::<(), GfxError>(())
        })
        .and_then(|()| {
            ctx.create_buffer(size, usage | vk::BufferUsageFlags::TRANSFER_DST, MemoryIntent::DeviceLocal, name)
        })
        .and_then(|buffer| {
            let copy = TransferOp::CopyBuffer {
                src: &staging,
                dst: &buffer,
                size,
            };
            match ctx.submit_and_wait(name, &[copy]) {
                Ok(()) => Ok(buffer),
                Err(e) => {
                    ctx.destroy_buffer(buffer);
                    Err(e)
                }
            }
        });

    // submit_and_wait 返回时传输已经完成，或者根本没有提交
    ctx.destroy_buffer(staging);
    uploaded
}

/// 解压纹理到 staging buffer，上传到 image 并生成完整的 mip chain
///
/// `source` 是纹理文件的路径，仅用于错误信息
pub fn upload_texture<C>(
    ctx: &C,
    texture: &CompressedTexture,
    source: &Path,
    name: &str,
) -> Result<UploadedTexture, ModelError>
where
    C: GpuAllocator + TransferContext + GfxFactory,
{
    let staging = ctx.create_buffer(
        texture.raw_size() as vk::DeviceSize,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryIntent::Staging,
        &format!("{name}-staging"),
    )?;

    let uploaded = upload_image_from_staging(ctx, texture, &staging, source, name);
    ctx.destroy_buffer(staging);
    let image = uploaded?;

    match ctx.create_image_view(&image, name) {
        Ok(view) => Ok(UploadedTexture { image, view }),
        Err(e) => {
            ctx.destroy_image(image);
            Err(e.into())
        }
    }
}

/// 上传已经在内存中的、紧密排列的像素，`desc` 决定格式和 mip 数量
pub fn upload_pixels<C>(ctx: &C, pixels: &[u8], desc: &GfxImageDesc, name: &str) -> GfxResult<UploadedTexture>
where
    C: GpuAllocator + TransferContext + GfxFactory,
{
    let staging = ctx.create_buffer(
        pixels.len() as vk::DeviceSize,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryIntent::Staging,
        &format!("{name}-staging"),
    )?;

    let uploaded = ctx
        .write_buffer(&staging, |dst| {
            dst[..pixels.len()].copy_from_slice(pixels);
            Ok::<(), GfxError>(())
        })
        .and_then(|()| ctx.create_image(desc, name))
        .and_then(|image| {
            let upload = TransferOp::UploadImage {
                src: &staging,
                dst: &image,
            };
            match ctx.submit_and_wait(name, &[upload]) {
                Ok(()) => Ok(image),
                Err(e) => {
                    ctx.destroy_image(image);
                    Err(e)
                }
            }
        });
    ctx.destroy_buffer(staging);
    let image = uploaded?;

    match ctx.create_image_view(&image, name) {
        Ok(view) => Ok(UploadedTexture { image, view }),
        Err(e) => {
            ctx.destroy_image(image);
            Err(e)
        }
    }
}

fn upload_image_from_staging<C>(
    ctx: &C,
    texture: &CompressedTexture,
    staging: &GfxBuffer,
    source: &Path,
    name: &str,
) -> Result<GfxImage, ModelError>
where
    C: GpuAllocator + TransferContext,
{
    // 在映射的 staging 内存上直接解压，不经过额外的 CPU 缓冲
    ctx.write_buffer(staging, |dst| {
        texture.decompress_into(dst, source).map_err(ModelError::from)
    })?;

    let desc = GfxImageDesc::sampled_texture(texture.width(), texture.height(), TEXTURE_FORMAT);
    let image = ctx.create_image(&desc, name)?;
    let upload = TransferOp::UploadImage {
        src: staging,
        dst: &image,
    };
    if let Err(e) = ctx.submit_and_wait(name, &[upload]) {
        ctx.destroy_image(image);
        return Err(e.into());
    }

    log::debug!(
        "texture {} uploaded: {}x{}, {} mips",
        name,
        texture.width(),
        texture.height(),
        desc.mip_levels
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use lumen_asset::AssetErrorKind;

    use super::*;
    use crate::test_support::MockGpu;

    #[test]
    fn staging_is_freed_after_the_copy() {
        let gpu = MockGpu::new();
        let bytes: Vec<u8> = (0..64).collect();

        let buffer = upload_buffer(&gpu, &bytes, vk::BufferUsageFlags::VERTEX_BUFFER, "vertices").unwrap();

        assert_eq!(gpu.buffer_contents(&buffer), bytes);
        assert_eq!(buffer.intent(), MemoryIntent::DeviceLocal);
        assert!(gpu.position("submit_and_wait:vertices") < gpu.position("destroy_buffer:vertices-staging"));
        assert_eq!(gpu.live_count(), 1);
        gpu.destroy_buffer(buffer);
    }

    #[test]
    fn failed_copy_releases_both_buffers() {
        let gpu = MockGpu::new();
        gpu.fail_on("submit_and_wait");

        let result = upload_buffer(&gpu, &[1, 2, 3, 4], vk::BufferUsageFlags::INDEX_BUFFER, "indices");

        assert!(result.is_err());
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn texture_is_decompressed_into_staging() {
        let gpu = MockGpu::new();
        let pixels: Vec<u8> = (0..4 * 4 * 4).map(|i| (i % 7) as u8).collect();
        let texture = CompressedTexture::encode(&pixels, 4, 4);

        let uploaded = upload_texture(&gpu, &texture, Path::new("albedo.ltex"), "albedo").unwrap();

        assert_eq!(gpu.image_contents(&uploaded.image), pixels);
        assert_eq!(uploaded.image.mip_levels(), 3);
        assert_eq!(uploaded.image.format(), TEXTURE_FORMAT);
        assert!(gpu.position("submit_and_wait:albedo") < gpu.position("destroy_buffer:albedo-staging"));

        gpu.destroy_image_view(uploaded.view);
        gpu.destroy_image(uploaded.image);
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn corrupt_payload_is_an_asset_error() {
        let gpu = MockGpu::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ltex");

        // header 合法，但 payload 不是有效的 lz4 数据
        let header = br#"{"width":4,"height":4,"binarySize":3}"#;
        let mut bytes = (header.len() as u64).to_ne_bytes().to_vec();
        bytes.extend_from_slice(header);
        bytes.extend_from_slice(&[0xff, 0xff, 0xff]);
        std::fs::write(&path, &bytes).unwrap();
        let broken = CompressedTexture::decode(&path).unwrap();

        let err = upload_texture(&gpu, &broken, &path, "broken").unwrap_err();

        match err {
            ModelError::Asset(e) => assert_eq!(e.kind(), AssetErrorKind::Corrupt),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(gpu.live_count(), 0);
    }
}
