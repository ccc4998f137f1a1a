use std::{ffi::CStr, path::PathBuf};

use ash::vk;
use itertools::Itertools;

use crate::{
    error::{GfxError, GfxResult},
    foundation::device::GfxDevice,
    pipelines::shader::{GfxShaderModule, ShaderStageInfo},
};

/// 创建 graphics pipeline 所需的全部状态
///
/// 使用 dynamic rendering，不需要 render pass；viewport 和 scissor 是动态的
#[derive(Clone, Debug)]
pub struct GfxGraphicsPipelineCreateInfo {
    /// dynamic render 需要的 framebuffer 信息
    color_attach_formats: Vec<vk::Format>,
    /// UNDEFINED 表示不使用深度附件
    depth_attach_format: vk::Format,

    shader_stages: Vec<ShaderStageInfo>,

    vertex_binding_desc: Vec<vk::VertexInputBindingDescription>,
    vertex_attribute_desc: Vec<vk::VertexInputAttributeDescription>,

    primitive_topology: vk::PrimitiveTopology,

    cull_mode: vk::CullModeFlags,
    front_face: vk::FrontFace,

    /// None 表示关闭深度测试
    depth_compare_op: Option<vk::CompareOp>,
    depth_write: bool,

    color_attach_blend_states: Vec<vk::PipelineColorBlendAttachmentState>,
}
impl Default for GfxGraphicsPipelineCreateInfo {
    fn default() -> Self {
        Self {
            color_attach_formats: vec![],
            depth_attach_format: vk::Format::UNDEFINED,
            shader_stages: vec![],
            vertex_binding_desc: vec![],
            vertex_attribute_desc: vec![],
            primitive_topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            cull_mode: vk::CullModeFlags::BACK,
            // 按照 OpenGL 的传统，将 CCW 视为 front face
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            depth_compare_op: Some(vk::CompareOp::LESS),
            depth_write: true,
            color_attach_blend_states: vec![],
        }
    }
}

// builder
impl GfxGraphicsPipelineCreateInfo {
    /// 每个 color attachment 默认不开启混合
    #[inline]
    pub fn attach_info(&mut self, color_attach_formats: Vec<vk::Format>, depth_format: Option<vk::Format>) -> &mut Self {
        self.color_attach_blend_states = color_attach_formats
            .iter()
            .map(|_| {
                vk::PipelineColorBlendAttachmentState::default()
                    .blend_enable(false)
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
            })
            .collect();
        self.color_attach_formats = color_attach_formats;
        self.depth_attach_format = depth_format.unwrap_or(vk::Format::UNDEFINED);
        self
    }

    #[inline]
    pub fn vertex_shader_stage(&mut self, path: impl Into<PathBuf>, entry_point: &'static CStr) -> &mut Self {
        self.shader_stages.push(ShaderStageInfo {
            stage: vk::ShaderStageFlags::VERTEX,
            entry_point,
            path: path.into(),
        });
        self
    }

    #[inline]
    pub fn fragment_shader_stage(&mut self, path: impl Into<PathBuf>, entry_point: &'static CStr) -> &mut Self {
        self.shader_stages.push(ShaderStageInfo {
            stage: vk::ShaderStageFlags::FRAGMENT,
            entry_point,
            path: path.into(),
        });
        self
    }

    #[inline]
    pub fn vertex_binding(&mut self, bindings: Vec<vk::VertexInputBindingDescription>) -> &mut Self {
        self.vertex_binding_desc = bindings;
        self
    }

    #[inline]
    pub fn vertex_attribute(&mut self, attributes: Vec<vk::VertexInputAttributeDescription>) -> &mut Self {
        self.vertex_attribute_desc = attributes;
        self
    }

    /// 为每个 color attachment 指定 blend 操作，数量需要和 color attachment 一致
    #[inline]
    pub fn color_blend(&mut self, states: Vec<vk::PipelineColorBlendAttachmentState>) -> &mut Self {
        self.color_attach_blend_states = states;
        self
    }

    #[inline]
    pub fn cull_mode(&mut self, mode: vk::CullModeFlags, front_face: vk::FrontFace) -> &mut Self {
        self.cull_mode = mode;
        self.front_face = front_face;
        self
    }

    #[inline]
    pub fn depth_test(&mut self, depth_test_op: Option<vk::CompareOp>, depth_write: bool) -> &mut Self {
        self.depth_compare_op = depth_test_op;
        self.depth_write = depth_write;
        self
    }
}

// getters
impl GfxGraphicsPipelineCreateInfo {
    #[inline]
    pub fn shader_stages(&self) -> &[ShaderStageInfo] {
        &self.shader_stages
    }
    #[inline]
    pub fn color_attach_formats(&self) -> &[vk::Format] {
        &self.color_attach_formats
    }
    #[inline]
    pub fn depth_attach_format(&self) -> vk::Format {
        self.depth_attach_format
    }
    #[inline]
    pub fn cull_mode_flags(&self) -> (vk::CullModeFlags, vk::FrontFace) {
        (self.cull_mode, self.front_face)
    }
    #[inline]
    pub fn depth_compare_op(&self) -> Option<vk::CompareOp> {
        self.depth_compare_op
    }
    #[inline]
    pub fn vertex_stride(&self) -> Option<u32> {
        self.vertex_binding_desc.first().map(|b| b.stride)
    }
    #[inline]
    pub fn primitive_topology(&self) -> vk::PrimitiveTopology {
        self.primitive_topology
    }
    #[inline]
    pub fn color_blend_states(&self) -> &[vk::PipelineColorBlendAttachmentState] {
        &self.color_attach_blend_states
    }
}

// tools
impl GfxGraphicsPipelineCreateInfo {
    /// 加载 shader，创建 pipeline，然后销毁 shader module
    pub fn create_pipeline(&self, device: &GfxDevice, layout: vk::PipelineLayout) -> GfxResult<vk::Pipeline> {
        if self.color_attach_blend_states.len() != self.color_attach_formats.len() {
            return Err(GfxError::InvalidUsage(format!(
                "{} blend states for {} color attachments",
                self.color_attach_blend_states.len(),
                self.color_attach_formats.len()
            )));
        }

        let mut shader_modules = Vec::with_capacity(self.shader_stages.len());
        let result = self.load_shaders(device, &mut shader_modules).and_then(|()| {
            let stages = self
                .shader_stages
                .iter()
                .zip_eq(&shader_modules)
                .map(|(stage, module)| {
                    vk::PipelineShaderStageCreateInfo::default()
                        .stage(stage.stage)
                        .module(module.handle())
                        .name(stage.entry_point)
                })
                .collect_vec();
            self.create_with_stages(device, layout, &stages)
        });

        shader_modules.into_iter().for_each(|module| module.destroy(device));
        result
    }

    fn load_shaders(&self, device: &GfxDevice, modules: &mut Vec<GfxShaderModule>) -> GfxResult<()> {
        for stage in &self.shader_stages {
            modules.push(GfxShaderModule::new(device, &stage.path)?);
        }
        Ok(())
    }

    fn create_with_stages(
        &self,
        device: &GfxDevice,
        layout: vk::PipelineLayout,
        stages: &[vk::PipelineShaderStageCreateInfo],
    ) -> GfxResult<vk::Pipeline> {
        // dynamic rendering 需要的 framebuffer 信息
        let mut attach_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&self.color_attach_formats)
            .depth_attachment_format(self.depth_attach_format);

        let vertex_input_state_info = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&self.vertex_binding_desc)
            .vertex_attribute_descriptions(&self.vertex_attribute_desc);

        let input_assembly_info = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(self.primitive_topology)
            .primitive_restart_enable(false);

        // viewport 和 scissor 具体值由 dynamic 决定，但是数量由该 create info 决定
        let viewport_info = vk::PipelineViewportStateCreateInfo {
            viewport_count: 1,
            scissor_count: 1,
            ..Default::default()
        };

        let rasterize_state_info = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(self.cull_mode)
            .front_face(self.front_face)
            .depth_bias_enable(false);

        let msaa_info = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_info = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&self.color_attach_blend_states);

        let depth_stencil_info = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(self.depth_compare_op.is_some())
            .depth_compare_op(self.depth_compare_op.unwrap_or(vk::CompareOp::NEVER))
            .depth_write_enable(self.depth_write)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state_info = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(stages)
            .vertex_input_state(&vertex_input_state_info)
            .input_assembly_state(&input_assembly_info)
            .viewport_state(&viewport_info)
            .rasterization_state(&rasterize_state_info)
            .multisample_state(&msaa_info)
            .color_blend_state(&color_blend_info)
            .depth_stencil_state(&depth_stencil_info)
            .layout(layout)
            .dynamic_state(&dynamic_state_info)
            .push_next(&mut attach_info);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_info), None)
        };
        match pipelines {
            Ok(pipelines) => Ok(pipelines[0]),
            Err((_, result)) => Err(GfxError::GpuOperationFailed {
                op: "vkCreateGraphicsPipelines",
                result,
            }),
        }
    }
}
