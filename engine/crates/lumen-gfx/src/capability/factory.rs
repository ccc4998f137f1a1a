use ash::vk;

use crate::{
    error::GfxResult,
    pipelines::graphics_pipeline::GfxGraphicsPipelineCreateInfo,
    resources::{image::GfxImage, sampler::GfxSamplerDesc},
};

/// 创建和销毁不持有内存的 vulkan 对象
///
/// 返回的都是裸 handle，由调用方负责以正确的顺序销毁
pub trait GfxFactory {
    /// 覆盖 image 的全部 mip
    fn create_image_view(&self, image: &GfxImage, name: &str) -> GfxResult<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);

    fn create_sampler(&self, desc: &GfxSamplerDesc, name: &str) -> GfxResult<vk::Sampler>;
    fn destroy_sampler(&self, sampler: vk::Sampler);

    fn create_descriptor_set_layout(
        &self,
        bindings: &[vk::DescriptorSetLayoutBinding<'_>],
        name: &str,
    ) -> GfxResult<vk::DescriptorSetLayout>;
    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
        name: &str,
    ) -> GfxResult<vk::DescriptorPool>;
    /// 同时释放从 pool 中分配的所有 descriptor set
    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);

    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        name: &str,
    ) -> GfxResult<vk::DescriptorSet>;

    /// image 需要处于 SHADER_READ_ONLY_OPTIMAL
    fn write_combined_image_sampler(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        view: vk::ImageView,
        sampler: vk::Sampler,
    );

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
        name: &str,
    ) -> GfxResult<vk::PipelineLayout>;
    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    fn create_graphics_pipeline(
        &self,
        create_info: &GfxGraphicsPipelineCreateInfo,
        layout: vk::PipelineLayout,
        name: &str,
    ) -> GfxResult<vk::Pipeline>;
    fn destroy_pipeline(&self, pipeline: vk::Pipeline);
}
