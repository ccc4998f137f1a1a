use std::path::{Path, PathBuf};

use ash::vk;
use lumen_asset::{
    AssetResult,
    scene::{AlphaMode, SceneDescription},
    texture_codec::CompressedTexture,
};
use lumen_crate_tools::resource::LumenPath;
use lumen_gfx::{
    GfxResult,
    capability::{DrawRecorder, GfxFactory, GpuAllocator, GpuContext},
    pipelines::graphics_pipeline::GfxGraphicsPipelineCreateInfo,
    resources::{buffer::GfxBuffer, sampler::GfxSamplerDesc},
};

use crate::{
    error::ModelError,
    model::{
        geometry::{ModelPrimitive, build_geometry},
        upload::{UploadedTexture, upload_buffer, upload_texture},
        vertex::Vertex,
    },
};

/// 模型 pipeline 依赖的外部状态，交换链重建之后可能改变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPipelineDesc {
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}
impl ModelPipelineDesc {
    /// 使用 `shader/.build/` 下编译好的 model shader
    pub fn new(color_format: vk::Format, depth_format: vk::Format) -> Self {
        Self {
            color_format,
            depth_format,
            vertex_shader: LumenPath::shader_build_path("model.vert"),
            fragment_shader: LumenPath::shader_build_path("model.frag"),
        }
    }
}

/// 一个材质对应的绑定对象，binding 0 是 albedo 的 combined image sampler
#[derive(Debug)]
pub struct ModelMaterial {
    pub albedo_texture: usize,
    pub alpha_mode: AlphaMode,
    set_layout: vk::DescriptorSetLayout,
    sampler: vk::Sampler,
    descriptor_set: vk::DescriptorSet,
}

/// 上传到 GPU 之后的模型
///
/// 所有 primitive 共享一个 vertex buffer 和一个 index buffer，
/// 每个 primitive 绘制 index buffer 中的一段。
///
/// # destroy
/// 必须通过 [`Model::destroy`] 销毁
pub struct Model {
    name: String,

    vertex_buffer: GfxBuffer,
    index_buffer: GfxBuffer,
    vertex_count: u32,
    index_count: u32,

    primitives: Vec<ModelPrimitive>,
    /// 每张被引用的 image 只上传一次
    images: Vec<UploadedTexture>,
    /// texture 下标 -> `images` 中的下标
    texture_images: Vec<usize>,
    materials: Vec<ModelMaterial>,

    /// 没有材质时不会创建
    descriptor_pool: Option<vk::DescriptorPool>,
    pipeline_layout: Option<vk::PipelineLayout>,
    pipeline: Option<vk::Pipeline>,

    root_scale: glam::Vec3,
}

// new & init
impl Model {
    /// push constant 中只有一个 mvp 矩阵
    const PUSH_CONSTANT_SIZE: u32 = size_of::<glam::Mat4>() as u32;

    /// 加载失败时不会留下任何 GPU 资源
    ///
    /// 几何数据和纹理文件在分配 GPU 资源之前读取，资源错误不会触碰 GPU
    pub fn load<C: GpuContext>(
        ctx: &C,
        scene: &SceneDescription,
        pipeline_desc: &ModelPipelineDesc,
    ) -> Result<Self, ModelError> {
        let name = model_name(scene.source());

        let geometry = build_geometry(scene)?;
        if geometry.indices.is_empty() {
            return Err(scene.structural("scene contains no triangles").into());
        }
        // 多个 texture 可以引用同一张 image
        let mut image_indices: Vec<usize> = Vec::new();
        let texture_images = scene
            .textures()
            .iter()
            .map(|texture| match image_indices.iter().position(|&image| image == texture.image) {
                Some(slot) => slot,
                None => {
                    image_indices.push(texture.image);
                    image_indices.len() - 1
                }
            })
            .collect::<Vec<_>>();
        let image_files = image_indices
            .iter()
            .map(|&image| {
                let path = scene.texture_path(image)?;
                let compressed = CompressedTexture::decode(&path)?;
                Ok(ImageFile {
                    image,
                    path,
                    compressed,
                })
            })
            .collect::<AssetResult<Vec<_>>>()?;

        let vertex_buffer = upload_buffer(
            ctx,
            bytemuck::cast_slice(&geometry.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &format!("{name}-vertices"),
        )?;
        let index_buffer = match upload_buffer(
            ctx,
            bytemuck::cast_slice(&geometry.indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
            &format!("{name}-indices"),
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                ctx.destroy_buffer(vertex_buffer);
                return Err(e.into());
            }
        };

        let mut model = Self {
            name,
            vertex_buffer,
            index_buffer,
            vertex_count: geometry.vertices.len() as u32,
            index_count: geometry.indices.len() as u32,
            primitives: geometry.primitives,
            images: Vec::with_capacity(image_files.len()),
            texture_images,
            materials: Vec::with_capacity(scene.materials().len()),
            descriptor_pool: None,
            pipeline_layout: None,
            pipeline: None,
            root_scale: glam::Vec3::from(scene.node_scale()),
        };

        if let Err(e) = model.init_bindings(ctx, scene, &image_files, pipeline_desc) {
            model.destroy(ctx);
            return Err(e);
        }

        log::info!(
            "model {} loaded: {} vertices, {} indices, {} primitives, {} textures ({} images), {} materials",
            model.name,
            model.vertex_count,
            model.index_count,
            model.primitives.len(),
            model.texture_images.len(),
            model.images.len(),
            model.materials.len()
        );
        Ok(model)
    }

    fn init_bindings<C: GpuContext>(
        &mut self,
        ctx: &C,
        scene: &SceneDescription,
        image_files: &[ImageFile],
        pipeline_desc: &ModelPipelineDesc,
    ) -> Result<(), ModelError> {
        for file in image_files {
            let image_name = format!("{}-image-{}", self.name, file.image);
            self.images.push(upload_texture(ctx, &file.compressed, &file.path, &image_name)?);
        }

        if scene.materials().is_empty() {
            log::warn!("model {} has no material, pipeline is not created", self.name);
            return Ok(());
        }

        // 多个材质可以共享同一张纹理，但每个 set 都占用一个 sampler 槽位
        let sampler_slots = scene.materials().len().max(self.texture_images.len()) as u32;
        let pool = ctx.create_descriptor_pool(
            scene.materials().len() as u32,
            &[vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: sampler_slots,
            }],
            &self.name,
        )?;
        self.descriptor_pool = Some(pool);

        for (material_index, material) in scene.materials().iter().enumerate() {
            let texture = self
                .texture_images
                .get(material.base_color_texture)
                .map(|&slot| &self.images[slot])
                .ok_or_else(|| {
                    scene.structural(format!(
                        "material {material_index} references texture {}, but there are only {}",
                        material.base_color_texture,
                        self.texture_images.len()
                    ))
                })?;
            let material_name = format!("{}-material-{material_index}", self.name);
            let mut created = create_material_bindings(ctx, pool, texture, &material_name)?;
            created.albedo_texture = material.base_color_texture;
            created.alpha_mode = material.alpha_mode;
            self.materials.push(created);
        }

        self.create_pipeline(ctx, pipeline_desc)?;
        Ok(())
    }

    fn create_pipeline(&mut self, ctx: &impl GfxFactory, pipeline_desc: &ModelPipelineDesc) -> GfxResult<()> {
        // 所有材质的 set layout 完全相同，任取一个即可
        let Some(first_material) = self.materials.first() else {
            return Ok(());
        };

        let layout = ctx.create_pipeline_layout(
            &[first_material.set_layout],
            &[vk::PushConstantRange {
                stage_flags: vk::ShaderStageFlags::VERTEX,
                offset: 0,
                size: Self::PUSH_CONSTANT_SIZE,
            }],
            &self.name,
        )?;
        self.pipeline_layout = Some(layout);

        let mut pipeline_ci = GfxGraphicsPipelineCreateInfo::default();
        pipeline_ci
            .vertex_shader_stage(pipeline_desc.vertex_shader.clone(), c"main")
            .fragment_shader_stage(pipeline_desc.fragment_shader.clone(), c"main")
            .attach_info(vec![pipeline_desc.color_format], Some(pipeline_desc.depth_format))
            .vertex_binding(Vertex::vertex_input_bindings())
            .vertex_attribute(Vertex::vertex_input_attributes())
            // 场景文件不保证三角形的绕序
            .cull_mode(vk::CullModeFlags::NONE, vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_test(Some(vk::CompareOp::LESS), true);

        self.pipeline = Some(ctx.create_graphics_pipeline(&pipeline_ci, layout, &self.name)?);
        Ok(())
    }
}

// getters
impl Model {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[inline]
    pub fn primitives(&self) -> &[ModelPrimitive] {
        &self.primitives
    }
    #[inline]
    pub fn materials(&self) -> &[ModelMaterial] {
        &self.materials
    }
    #[inline]
    pub fn materials_count(&self) -> usize {
        self.materials.len()
    }
    #[inline]
    pub fn textures_count(&self) -> usize {
        self.texture_images.len()
    }
    /// 实际上传到 GPU 的 image 数量
    #[inline]
    pub fn images_count(&self) -> usize {
        self.images.len()
    }
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
    #[inline]
    pub fn vertex_buffer(&self) -> &GfxBuffer {
        &self.vertex_buffer
    }
    #[inline]
    pub fn index_buffer(&self) -> &GfxBuffer {
        &self.index_buffer
    }
    #[inline]
    pub fn has_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }
    /// 场景中第一个 node 的 scale
    #[inline]
    pub fn root_scale(&self) -> glam::Vec3 {
        self.root_scale
    }
    #[inline]
    pub fn model_matrix(&self) -> glam::Mat4 {
        glam::Mat4::from_scale(self.root_scale)
    }
}

// update
impl Model {
    /// 交换链的格式变化之后重建 pipeline 和 pipeline layout
    pub fn rebuild_pipeline(&mut self, ctx: &impl GfxFactory, pipeline_desc: &ModelPipelineDesc) -> GfxResult<()> {
        if let Some(pipeline) = self.pipeline.take() {
            ctx.destroy_pipeline(pipeline);
        }
        if let Some(layout) = self.pipeline_layout.take() {
            ctx.destroy_pipeline_layout(layout);
        }
        self.create_pipeline(ctx, pipeline_desc)
    }
}

// draw
impl Model {
    /// 调用方需要已经开始 rendering，并设置好 viewport 和 scissor
    ///
    /// 每个 primitive 一次 indexed draw；没有材质的 primitive 不绘制
    pub fn draw(&self, recorder: &impl DrawRecorder, mvp: &glam::Mat4) {
        let (Some(pipeline), Some(layout)) = (self.pipeline, self.pipeline_layout) else {
            return;
        };

        recorder.bind_graphics_pipeline(pipeline);
        recorder.bind_vertex_buffer(self.vertex_buffer.vk_buffer(), 0);
        recorder.bind_index_buffer(self.index_buffer.vk_buffer(), 0, vk::IndexType::UINT32);
        recorder.push_constants(layout, vk::ShaderStageFlags::VERTEX, 0, bytemuck::bytes_of(mvp));

        for primitive in &self.primitives {
            let Some(material_index) = primitive.material_index else {
                continue;
            };
            recorder.bind_descriptor_set(layout, 0, self.materials[material_index].descriptor_set);
            recorder.draw_indexed(primitive.index_count, primitive.first_index, 0);
        }
    }
}

// destroy
impl Model {
    /// 按依赖顺序释放：pipeline、pipeline layout、index buffer、vertex buffer、
    /// 材质的 sampler 和 set layout、descriptor pool、纹理的 view 和 image
    pub fn destroy<C: GpuAllocator + GfxFactory>(self, ctx: &C) {
        if let Some(pipeline) = self.pipeline {
            ctx.destroy_pipeline(pipeline);
        }
        if let Some(layout) = self.pipeline_layout {
            ctx.destroy_pipeline_layout(layout);
        }
        ctx.destroy_buffer(self.index_buffer);
        ctx.destroy_buffer(self.vertex_buffer);
        for material in self.materials {
            ctx.destroy_sampler(material.sampler);
            ctx.destroy_descriptor_set_layout(material.set_layout);
        }
        // descriptor set 随 pool 一起释放
        if let Some(pool) = self.descriptor_pool {
            ctx.destroy_descriptor_pool(pool);
        }
        for image in self.images {
            ctx.destroy_image_view(image.view);
            ctx.destroy_image(image.image);
        }
        log::info!("model {} destroyed", self.name);
    }
}

/// 在分配 GPU 资源之前读出的一张 image
struct ImageFile {
    image: usize,
    path: PathBuf,
    compressed: CompressedTexture,
}

/// 创建一个材质的 set layout、sampler 和 descriptor set，并写入 albedo 纹理
fn create_material_bindings(
    ctx: &impl GfxFactory,
    pool: vk::DescriptorPool,
    albedo: &UploadedTexture,
    name: &str,
) -> GfxResult<ModelMaterial> {
    let bindings = [vk::DescriptorSetLayoutBinding::default()
        .binding(0)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::FRAGMENT)];
    let set_layout = ctx.create_descriptor_set_layout(&bindings, name)?;

    let sampler_desc = GfxSamplerDesc {
        max_anisotropy: 16,
        ..Default::default()
    };
    let sampler = match ctx.create_sampler(&sampler_desc, name) {
        Ok(sampler) => sampler,
        Err(e) => {
            ctx.destroy_descriptor_set_layout(set_layout);
            return Err(e);
        }
    };

    let descriptor_set = match ctx.allocate_descriptor_set(pool, set_layout, name) {
        Ok(set) => set,
        Err(e) => {
            ctx.destroy_sampler(sampler);
            ctx.destroy_descriptor_set_layout(set_layout);
            return Err(e);
        }
    };
    ctx.write_combined_image_sampler(descriptor_set, 0, albedo.view, sampler);

    Ok(ModelMaterial {
        albedo_texture: 0,
        alpha_mode: AlphaMode::default(),
        set_layout,
        sampler,
        descriptor_set,
    })
}

fn model_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}
