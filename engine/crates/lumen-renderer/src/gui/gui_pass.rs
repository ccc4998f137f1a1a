//! 参考 imgui-rs-vulkan-renderer

use std::path::PathBuf;

use ash::vk;
use itertools::Itertools;
use lumen_crate_tools::resource::LumenPath;
use lumen_gfx::{
    GfxResult,
    capability::{DrawRecorder, GfxFactory, GpuAllocator, GpuContext},
    pipelines::graphics_pipeline::GfxGraphicsPipelineCreateInfo,
    resources::{image::GfxImageDesc, sampler::GfxSamplerDesc},
};

use crate::{
    frame_counter::{FrameCounter, FrameLabel},
    gui::{gui_mesh::GuiMesh, gui_vertex::GuiVertex},
    model::upload::{UploadedTexture, upload_pixels},
};

/// gui pipeline 需要与所在的 dynamic rendering 的附件格式一致
#[derive(Debug, Clone)]
pub struct GuiPipelineDesc {
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl GuiPipelineDesc {
    pub fn new(color_format: vk::Format, depth_format: vk::Format) -> Self {
        Self {
            color_format,
            depth_format,
            vertex_shader: LumenPath::shader_build_path("imgui.vert"),
            fragment_shader: LumenPath::shader_build_path("imgui.frag"),
        }
    }
}

/// 将 imgui 的 clip rect 转换为 framebuffer 中的 scissor
///
/// 超出 framebuffer 的部分会被裁掉，面积为 0 时返回 None
pub fn clip_rect_to_scissor(
    clip_rect: [f32; 4],
    clip_offset: [f32; 2],
    clip_scale: [f32; 2],
    framebuffer: vk::Extent2D,
) -> Option<vk::Rect2D> {
    let min_x = ((clip_rect[0] - clip_offset[0]) * clip_scale[0]).max(0.0);
    let min_y = ((clip_rect[1] - clip_offset[1]) * clip_scale[1]).max(0.0);
    let max_x = ((clip_rect[2] - clip_offset[0]) * clip_scale[0]).min(framebuffer.width as f32);
    let max_y = ((clip_rect[3] - clip_offset[1]) * clip_scale[1]).min(framebuffer.height as f32);
    if max_x <= min_x || max_y <= min_y {
        return None;
    }

    Some(vk::Rect2D {
        offset: vk::Offset2D {
            x: min_x as i32,
            y: min_y as i32,
        },
        extent: vk::Extent2D {
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        },
    })
}

/// imgui 的绘制：字体纹理、pipeline 以及每个 frame slot 的 mesh
///
/// 只绑定字体纹理，所有的 imgui 命令都使用它
pub struct GuiPass {
    font_texture: UploadedTexture,
    sampler: vk::Sampler,
    set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set: vk::DescriptorSet,

    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,

    meshes: Vec<GuiMesh>,
}

// new & init
impl GuiPass {
    /// imgui 字体纹理的 id
    pub const FONT_TEXTURE_ID: usize = 0;
    const PUSH_CONSTANT_SIZE: u32 = size_of::<glam::Mat4>() as u32;

    /// 创建完成后需要将 imgui 字体的 `tex_id` 设置为 [`GuiPass::font_texture_id`]
    pub fn new<C: GpuContext>(
        ctx: &C,
        font_atlas: &imgui::FontAtlasTexture<'_>,
        pipeline_desc: &GuiPipelineDesc,
    ) -> GfxResult<Self> {
        // 字体纹理不需要 mip
        let font_desc = GfxImageDesc {
            extent: vk::Extent2D {
                width: font_atlas.width,
                height: font_atlas.height,
            },
            format: vk::Format::R8G8B8A8_UNORM,
            usage: vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            mip_levels: 1,
        };
        let font_texture = upload_pixels(ctx, font_atlas.data, &font_desc, "imgui-font")?;

        let mut pass = Self {
            font_texture,
            sampler: vk::Sampler::null(),
            set_layout: vk::DescriptorSetLayout::null(),
            descriptor_pool: vk::DescriptorPool::null(),
            descriptor_set: vk::DescriptorSet::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
            meshes: Vec::with_capacity(FrameCounter::fif_count()),
        };
        if let Err(e) = pass.init(ctx, pipeline_desc) {
            pass.destroy(ctx);
            return Err(e);
        }

        log::info!("gui pass created, font atlas {}x{}", font_atlas.width, font_atlas.height);
        Ok(pass)
    }

    #[inline]
    pub fn font_texture_id() -> imgui::TextureId {
        imgui::TextureId::new(Self::FONT_TEXTURE_ID)
    }

    fn init<C: GpuContext>(&mut self, ctx: &C, pipeline_desc: &GuiPipelineDesc) -> GfxResult<()> {
        self.sampler = ctx.create_sampler(
            &GfxSamplerDesc {
                address_mode: vk::SamplerAddressMode::CLAMP_TO_EDGE,
                ..Default::default()
            },
            "imgui-font",
        )?;

        let bindings = [vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)];
        self.set_layout = ctx.create_descriptor_set_layout(&bindings, "imgui")?;

        self.descriptor_pool = ctx.create_descriptor_pool(
            1,
            &[vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 1,
            }],
            "imgui",
        )?;
        self.descriptor_set = ctx.allocate_descriptor_set(self.descriptor_pool, self.set_layout, "imgui")?;
        ctx.write_combined_image_sampler(self.descriptor_set, 0, self.font_texture.view, self.sampler);

        self.pipeline_layout = ctx.create_pipeline_layout(
            &[self.set_layout],
            &[vk::PushConstantRange {
                stage_flags: vk::ShaderStageFlags::VERTEX,
                offset: 0,
                size: Self::PUSH_CONSTANT_SIZE,
            }],
            "imgui",
        )?;
        self.pipeline = Self::create_pipeline(ctx, self.pipeline_layout, pipeline_desc)?;

        for frame_label in FrameCounter::frame_labels() {
            self.meshes.push(GuiMesh::new(ctx, frame_label)?);
        }
        Ok(())
    }

    fn create_pipeline(
        ctx: &impl GfxFactory,
        layout: vk::PipelineLayout,
        pipeline_desc: &GuiPipelineDesc,
    ) -> GfxResult<vk::Pipeline> {
        let color_blend_attachments = vec![
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .alpha_blend_op(vk::BlendOp::ADD),
        ];

        let mut create_info = GfxGraphicsPipelineCreateInfo::default();
        create_info
            .vertex_shader_stage(pipeline_desc.vertex_shader.clone(), c"main")
            .fragment_shader_stage(pipeline_desc.fragment_shader.clone(), c"main")
            // 深度附件仍然存在，只是不参与测试
            .attach_info(vec![pipeline_desc.color_format], Some(pipeline_desc.depth_format))
            .vertex_binding(GuiVertex::vertex_input_bindings())
            .vertex_attribute(GuiVertex::vertex_input_attributes())
            .cull_mode(vk::CullModeFlags::NONE, vk::FrontFace::CLOCKWISE)
            .color_blend(color_blend_attachments)
            .depth_test(None, false);

        ctx.create_graphics_pipeline(&create_info, layout, "imgui")
    }
}

// update
impl GuiPass {
    /// 交换链格式变化之后重新创建 pipeline
    pub fn rebuild_pipeline(&mut self, ctx: &impl GfxFactory, pipeline_desc: &GuiPipelineDesc) -> GfxResult<()> {
        let pipeline = Self::create_pipeline(ctx, self.pipeline_layout, pipeline_desc)?;
        ctx.destroy_pipeline(std::mem::replace(&mut self.pipeline, pipeline));
        Ok(())
    }
}

// draw
impl GuiPass {
    /// 在已经开始的 dynamic rendering 中绘制 imgui 的 draw data
    ///
    /// 调用时 `frame_label` 对应的 slot 的 fence 必须已经被 signal，mesh 会被覆盖
    pub fn draw(
        &mut self,
        ctx: &impl GpuAllocator,
        recorder: &impl DrawRecorder,
        frame_label: FrameLabel,
        draw_data: &imgui::DrawData,
    ) -> GfxResult<()> {
        let framebuffer = vk::Extent2D {
            width: (draw_data.display_size[0] * draw_data.framebuffer_scale[0]) as u32,
            height: (draw_data.display_size[1] * draw_data.framebuffer_scale[1]) as u32,
        };
        if framebuffer.width == 0 || framebuffer.height == 0 || draw_data.total_idx_count <= 0 {
            return Ok(());
        }

        let vertices = draw_data
            .draw_lists()
            .flat_map(|draw_list| draw_list.vtx_buffer().iter().map(GuiVertex::from))
            .collect_vec();
        let indices = draw_data.draw_lists().flat_map(|draw_list| draw_list.idx_buffer().iter().copied()).collect_vec();

        let mesh = &mut self.meshes[frame_label.index()];
        mesh.fill(ctx, &vertices, &indices)?;
        let mesh = &self.meshes[frame_label.index()];

        self.setup_render_state(recorder, mesh, draw_data, framebuffer);

        let mut index_offset = 0;
        let mut vertex_offset = 0;
        let clip_offset = draw_data.display_pos;
        let clip_scale = draw_data.framebuffer_scale;
        for draw_list in draw_data.draw_lists() {
            for command in draw_list.commands() {
                match command {
                    imgui::DrawCmd::Elements {
                        count,
                        cmd_params:
                            imgui::DrawCmdParams {
                                clip_rect,
                                vtx_offset,
                                idx_offset,
                                ..
                            },
                    } => {
                        let Some(scissor) = clip_rect_to_scissor(clip_rect, clip_offset, clip_scale, framebuffer)
                        else {
                            continue;
                        };
                        recorder.set_scissor(scissor);
                        recorder.draw_indexed(
                            count as u32,
                            index_offset + idx_offset as u32,
                            vertex_offset + vtx_offset as i32,
                        );
                    }
                    imgui::DrawCmd::ResetRenderState => {
                        self.setup_render_state(recorder, mesh, draw_data, framebuffer);
                    }
                    imgui::DrawCmd::RawCallback { .. } => {
                        log::warn!("imgui raw callback is not supported");
                    }
                }
            }

            index_offset += draw_list.idx_buffer().len() as u32;
            vertex_offset += draw_list.vtx_buffer().len() as i32;
        }
        Ok(())
    }

    fn setup_render_state(
        &self,
        recorder: &impl DrawRecorder,
        mesh: &GuiMesh,
        draw_data: &imgui::DrawData,
        framebuffer: vk::Extent2D,
    ) {
        recorder.bind_graphics_pipeline(self.pipeline);
        recorder.set_viewport(vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: framebuffer.width as f32,
            height: framebuffer.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        recorder.bind_vertex_buffer(mesh.vertex_buffer().vk_buffer(), 0);
        recorder.bind_index_buffer(mesh.index_buffer().vk_buffer(), 0, vk::IndexType::UINT16);
        recorder.bind_descriptor_set(self.pipeline_layout, 0, self.descriptor_set);

        // imgui 的坐标原点在左上角，y 向下，与 vulkan 的 NDC 方向一致
        let [x, y] = draw_data.display_pos;
        let [width, height] = draw_data.display_size;
        let ortho = glam::Mat4::orthographic_rh(x, x + width, y, y + height, -1.0, 1.0);
        recorder.push_constants(self.pipeline_layout, vk::ShaderStageFlags::VERTEX, 0, bytemuck::bytes_of(&ortho));
    }
}

// destroy
impl GuiPass {
    /// 也用于清理初始化到一半的 pass，未创建的 handle 为 null
    pub fn destroy<C: GpuAllocator + GfxFactory>(self, ctx: &C) {
        for mesh in self.meshes {
            mesh.destroy(ctx);
        }
        if self.pipeline != vk::Pipeline::null() {
            ctx.destroy_pipeline(self.pipeline);
        }
        if self.pipeline_layout != vk::PipelineLayout::null() {
            ctx.destroy_pipeline_layout(self.pipeline_layout);
        }
        if self.descriptor_pool != vk::DescriptorPool::null() {
            ctx.destroy_descriptor_pool(self.descriptor_pool);
        }
        if self.set_layout != vk::DescriptorSetLayout::null() {
            ctx.destroy_descriptor_set_layout(self.set_layout);
        }
        if self.sampler != vk::Sampler::null() {
            ctx.destroy_sampler(self.sampler);
        }
        ctx.destroy_image_view(self.font_texture.view);
        ctx.destroy_image(self.font_texture.image);
        log::info!("gui pass destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{DrawCall, MockGpu, MockRecorder};

    fn pipeline_desc() -> GuiPipelineDesc {
        GuiPipelineDesc {
            color_format: vk::Format::B8G8R8A8_SRGB,
            depth_format: vk::Format::D32_SFLOAT,
            vertex_shader: PathBuf::from("imgui.vert.spv"),
            fragment_shader: PathBuf::from("imgui.frag.spv"),
        }
    }

    fn font_pixels() -> Vec<u8> {
        (0..8 * 4 * 4).map(|i| i as u8).collect()
    }

    fn font_atlas(pixels: &[u8]) -> imgui::FontAtlasTexture<'_> {
        imgui::FontAtlasTexture {
            width: 8,
            height: 4,
            data: pixels,
        }
    }

    #[test]
    fn scissor_is_clamped_to_the_framebuffer() {
        let framebuffer = vk::Extent2D {
            width: 800,
            height: 600,
        };

        let scissor = clip_rect_to_scissor([-10.0, 20.0, 900.0, 100.0], [0.0, 0.0], [1.0, 1.0], framebuffer).unwrap();
        assert_eq!(scissor.offset, vk::Offset2D { x: 0, y: 20 });
        assert_eq!(
            scissor.extent,
            vk::Extent2D {
                width: 800,
                height: 80
            }
        );

        // framebuffer 缩放为 2，display 原点偏移 (10, 10)
        let scissor = clip_rect_to_scissor([20.0, 20.0, 60.0, 40.0], [10.0, 10.0], [2.0, 2.0], framebuffer).unwrap();
        assert_eq!(scissor.offset, vk::Offset2D { x: 20, y: 20 });
        assert_eq!(
            scissor.extent,
            vk::Extent2D {
                width: 80,
                height: 40
            }
        );
    }

    #[test]
    fn empty_clip_rect_is_skipped() {
        let framebuffer = vk::Extent2D {
            width: 800,
            height: 600,
        };
        assert!(clip_rect_to_scissor([100.0, 100.0, 100.0, 200.0], [0.0; 2], [1.0; 2], framebuffer).is_none());
        assert!(clip_rect_to_scissor([900.0, 0.0, 1000.0, 10.0], [0.0; 2], [1.0; 2], framebuffer).is_none());
    }

    #[test]
    fn pipeline_blends_without_depth_test() {
        let gpu = MockGpu::new();
        let pixels = font_pixels();

        let pass = GuiPass::new(&gpu, &font_atlas(&pixels), &pipeline_desc()).unwrap();

        let pipelines = gpu.pipelines();
        assert_eq!(pipelines.len(), 1);
        let create_info = &pipelines[0];
        assert_eq!(create_info.depth_compare_op(), None);
        assert_eq!(create_info.depth_attach_format(), vk::Format::D32_SFLOAT);
        assert_eq!(create_info.cull_mode_flags().0, vk::CullModeFlags::NONE);
        assert_eq!(create_info.color_blend_states()[0].blend_enable, vk::TRUE);
        assert_eq!(create_info.vertex_stride(), Some(20));

        assert_eq!(gpu.count("create_buffer:imgui-vertex-"), 2);
        assert_eq!(gpu.count("create_buffer:imgui-index-"), 2);
        assert!(gpu.log().contains(&"write_descriptor:imgui:0:imgui-font".to_string()));
        pass.destroy(&gpu);
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn font_atlas_is_uploaded_without_mips() {
        let gpu = MockGpu::new();
        let pixels = font_pixels();

        let pass = GuiPass::new(&gpu, &font_atlas(&pixels), &pipeline_desc()).unwrap();

        assert_eq!(pass.font_texture.image.mip_levels(), 1);
        assert_eq!(pass.font_texture.image.format(), vk::Format::R8G8B8A8_UNORM);
        assert_eq!(gpu.image_contents(&pass.font_texture.image), pixels);
        assert!(gpu.position("submit_and_wait:imgui-font") < gpu.position("destroy_buffer:imgui-font-staging"));
        pass.destroy(&gpu);
    }

    #[test]
    fn failed_pipeline_releases_everything() {
        let gpu = MockGpu::new();
        gpu.fail_on("create_graphics_pipeline");
        let pixels = font_pixels();

        assert!(GuiPass::new(&gpu, &font_atlas(&pixels), &pipeline_desc()).is_err());
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn rebuild_replaces_the_pipeline() {
        let gpu = MockGpu::new();
        let pixels = font_pixels();
        let mut pass = GuiPass::new(&gpu, &font_atlas(&pixels), &pipeline_desc()).unwrap();

        let desc = GuiPipelineDesc {
            color_format: vk::Format::R8G8B8A8_SRGB,
            ..pipeline_desc()
        };
        pass.rebuild_pipeline(&gpu, &desc).unwrap();

        assert_eq!(gpu.count("destroy_pipeline:imgui"), 1);
        assert_eq!(gpu.pipelines()[1].color_attach_formats(), [vk::Format::R8G8B8A8_SRGB]);
        pass.destroy(&gpu);
        assert_eq!(gpu.live_count(), 0);
    }

    /// 使用真实的 imgui context 生成 draw data
    #[test]
    fn imgui_frame_is_recorded_with_scissors() {
        let gpu = MockGpu::new();
        let mut imgui = imgui::Context::create();
        imgui.set_ini_filename(None);
        imgui.io_mut().display_size = [800.0, 600.0];

        let mut pass = {
            let atlas = imgui.fonts().build_rgba32_texture();
            GuiPass::new(&gpu, &atlas, &pipeline_desc()).unwrap()
        };
        imgui.fonts().tex_id = GuiPass::font_texture_id();

        let ui = imgui.new_frame();
        ui.window("stats").size([300.0, 120.0], imgui::Condition::Always).build(|| {
            ui.text("frame 1");
            ui.text("vertices 8");
        });
        let draw_data = imgui.render();
        let total_indices = draw_data.total_idx_count as u32;

        let recorder = MockRecorder::default();
        pass.draw(&gpu, &recorder, FrameLabel::A, draw_data).unwrap();

        let calls = recorder.calls();
        assert!(matches!(calls[0], DrawCall::BindPipeline(_)));
        assert!(calls.contains(&DrawCall::Viewport {
            width: 800.0,
            height: 600.0
        }));
        assert!(calls.iter().any(|c| matches!(c, DrawCall::BindIndexBuffer(_, vk::IndexType::UINT16))));

        let draws = recorder.draws();
        assert!(!draws.is_empty());
        for (count, first, _) in &draws {
            assert!(first + count <= total_indices);
        }
        // 每个 draw 之前都有 scissor
        for (i, call) in calls.iter().enumerate() {
            if matches!(call, DrawCall::DrawIndexed { .. }) {
                assert!(matches!(calls[i - 1], DrawCall::Scissor { .. }));
            }
        }

        pass.destroy(&gpu);
        assert_eq!(gpu.live_count(), 0);
    }
}
