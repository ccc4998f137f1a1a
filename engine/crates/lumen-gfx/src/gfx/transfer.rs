use ash::vk;

use crate::{
    capability::{TransferContext, TransferOp},
    commands::{barrier::GfxImageBarrier, command_buffer::GfxCommandBuffer},
    error::{GfxError, GfxResult},
    gfx::Gfx,
    resources::{buffer::GfxBuffer, image::GfxImage},
};

impl TransferContext for Gfx {
    fn submit_and_wait(&self, name: &str, ops: &[TransferOp<'_>]) -> GfxResult<()> {
        for op in ops {
            if let TransferOp::UploadImage { dst, .. } = op {
                self.check_blit_support(dst)?;
            }
        }

        self.one_time_exec(name, |cmd| {
            for op in ops {
                match *op {
                    TransferOp::CopyBuffer { src, dst, size } => record_copy_buffer(cmd, src, dst, size)?,
                    TransferOp::UploadImage { src, dst } => record_upload_image(cmd, src, dst),
                }
            }
            Ok(())
        })
    }
}

impl Gfx {
    /// 生成 mip chain 需要 format 支持 linear blit
    fn check_blit_support(&self, image: &GfxImage) -> GfxResult<()> {
        if image.mip_levels() <= 1 {
            return Ok(());
        }
        let required = vk::FormatFeatureFlags::BLIT_SRC
            | vk::FormatFeatureFlags::BLIT_DST
            | vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR;
        if self.find_supported_format(&[image.format()], vk::ImageTiling::OPTIMAL, required).is_empty() {
            return Err(GfxError::InvalidUsage(format!(
                "format {:?} of image {} does not support linear blit",
                image.format(),
                image.name()
            )));
        }
        Ok(())
    }
}

fn record_copy_buffer(cmd: &GfxCommandBuffer, src: &GfxBuffer, dst: &GfxBuffer, size: vk::DeviceSize) -> GfxResult<()> {
    if size > src.size() || size > dst.size() {
        return Err(GfxError::InvalidUsage(format!(
            "copy {} bytes from {} ({} bytes) to {} ({} bytes)",
            size,
            src.name(),
            src.size(),
            dst.name(),
            dst.size()
        )));
    }
    cmd.cmd_copy_buffer(
        src.vk_buffer(),
        dst.vk_buffer(),
        &[vk::BufferCopy {
            size,
            ..Default::default()
        }],
    );
    Ok(())
}

/// buffer -> mip 0，然后逐级 blit 生成剩余的 mip
///
/// 每一级在作为 blit 源之后转换为 SHADER_READ_ONLY_OPTIMAL，最后一级在循环结束后转换
fn record_upload_image(cmd: &GfxCommandBuffer, src: &GfxBuffer, dst: &GfxImage) {
    let image = dst.vk_image();
    let mip_levels = dst.mip_levels();
    let aspect = dst.desc().aspect();

    cmd.image_memory_barrier(
        vk::DependencyFlags::empty(),
        &[GfxImageBarrier::new()
            .image(image)
            .mip_range(0, mip_levels)
            .image_aspect_flag(aspect)
            .layout_transfer(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .src_mask(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::empty())
            .dst_mask(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE)],
    );

    let region = vk::BufferImageCopy2::default()
        .buffer_offset(0)
        .image_subresource(subresource_layers(aspect, 0))
        .image_extent(dst.extent().into());
    cmd.cmd_copy_buffer_to_image(
        &vk::CopyBufferToImageInfo2::default()
            .src_buffer(src.vk_buffer())
            .dst_image(image)
            .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .regions(std::slice::from_ref(&region)),
    );

    let mut mip_width = dst.extent().width as i32;
    let mut mip_height = dst.extent().height as i32;
    for level in 1..mip_levels {
        // 上一级：TRANSFER_DST -> TRANSFER_SRC
        cmd.image_memory_barrier(
            vk::DependencyFlags::empty(),
            &[GfxImageBarrier::new()
                .image(image)
                .mip_range(level - 1, 1)
                .image_aspect_flag(aspect)
                .layout_transfer(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .src_mask(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE)
                .dst_mask(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_READ)],
        );

        let next_width = (mip_width / 2).max(1);
        let next_height = (mip_height / 2).max(1);
        let blit = vk::ImageBlit2::default()
            .src_subresource(subresource_layers(aspect, level - 1))
            .src_offsets([
                vk::Offset3D::default(),
                vk::Offset3D {
                    x: mip_width,
                    y: mip_height,
                    z: 1,
                },
            ])
            .dst_subresource(subresource_layers(aspect, level))
            .dst_offsets([
                vk::Offset3D::default(),
                vk::Offset3D {
                    x: next_width,
                    y: next_height,
                    z: 1,
                },
            ]);
        cmd.cmd_blit_image(
            &vk::BlitImageInfo2::default()
                .src_image(image)
                .src_image_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .dst_image(image)
                .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .regions(std::slice::from_ref(&blit))
                .filter(vk::Filter::LINEAR),
        );

        // 上一级已经不再需要：TRANSFER_SRC -> SHADER_READ_ONLY
        cmd.image_memory_barrier(
            vk::DependencyFlags::empty(),
            &[GfxImageBarrier::new()
                .image(image)
                .mip_range(level - 1, 1)
                .image_aspect_flag(aspect)
                .layout_transfer(vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_mask(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_READ)
                .dst_mask(vk::PipelineStageFlags2::FRAGMENT_SHADER, vk::AccessFlags2::SHADER_READ)],
        );

        mip_width = next_width;
        mip_height = next_height;
    }

    // 最后一级只被写入过
    cmd.image_memory_barrier(
        vk::DependencyFlags::empty(),
        &[GfxImageBarrier::new()
            .image(image)
            .mip_range(mip_levels - 1, 1)
            .image_aspect_flag(aspect)
            .layout_transfer(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_mask(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE)
            .dst_mask(vk::PipelineStageFlags2::FRAGMENT_SHADER, vk::AccessFlags2::SHADER_READ)],
    );
}

fn subresource_layers(aspect: vk::ImageAspectFlags, mip_level: u32) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: aspect,
        mip_level,
        base_array_layer: 0,
        layer_count: 1,
    }
}
