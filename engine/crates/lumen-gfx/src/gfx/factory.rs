use ash::vk;

use crate::{
    capability::GfxFactory,
    error::{GfxResult, VkResultExt},
    gfx::Gfx,
    pipelines::graphics_pipeline::GfxGraphicsPipelineCreateInfo,
    resources::{image::GfxImage, sampler::GfxSamplerDesc},
};

impl GfxFactory for Gfx {
    fn create_image_view(&self, image: &GfxImage, name: &str) -> GfxResult<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image.vk_image())
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(image.format())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: image.desc().aspect(),
                base_mip_level: 0,
                level_count: image.mip_levels(),
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe { self.device.create_image_view(&create_info, None).gfx_op("vkCreateImageView")? };
        self.device.set_object_debug_name(view, format!("ImageView::{}", name));
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_sampler(&self, desc: &GfxSamplerDesc, name: &str) -> GfxResult<vk::Sampler> {
        let create_info = desc.create_info(self.physical_device.max_sampler_anisotropy());
        let sampler = unsafe { self.device.create_sampler(&create_info, None).gfx_op("vkCreateSampler")? };
        self.device.set_object_debug_name(sampler, format!("Sampler::{}", name));
        Ok(sampler)
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe { self.device.destroy_sampler(sampler, None) }
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[vk::DescriptorSetLayoutBinding<'_>],
        name: &str,
    ) -> GfxResult<vk::DescriptorSetLayout> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
        let layout = unsafe {
            self.device.create_descriptor_set_layout(&create_info, None).gfx_op("vkCreateDescriptorSetLayout")?
        };
        self.device.set_object_debug_name(layout, format!("DescriptorSetLayout::{}", name));
        Ok(layout)
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) }
    }

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
        name: &str,
    ) -> GfxResult<vk::DescriptorPool> {
        let create_info = vk::DescriptorPoolCreateInfo::default().max_sets(max_sets).pool_sizes(pool_sizes);
        let pool =
            unsafe { self.device.create_descriptor_pool(&create_info, None).gfx_op("vkCreateDescriptorPool")? };
        self.device.set_object_debug_name(pool, format!("DescriptorPool::{}", name));
        Ok(pool)
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) }
    }

    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        name: &str,
    ) -> GfxResult<vk::DescriptorSet> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default().descriptor_pool(pool).set_layouts(&layouts);
        let sets =
            unsafe { self.device.allocate_descriptor_sets(&alloc_info).gfx_op("vkAllocateDescriptorSets")? };
        self.device.set_object_debug_name(sets[0], format!("DescriptorSet::{}", name));
        Ok(sets[0])
    }

    fn write_combined_image_sampler(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        view: vk::ImageView,
        sampler: vk::Sampler,
    ) {
        let image_info = vk::DescriptorImageInfo::default()
            .image_view(view)
            .sampler(sampler)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(std::slice::from_ref(&image_info));
        unsafe { self.device.update_descriptor_sets(std::slice::from_ref(&write), &[]) }
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
        name: &str,
    ) -> GfxResult<vk::PipelineLayout> {
        let create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(set_layouts)
            .push_constant_ranges(push_constant_ranges);
        let layout =
            unsafe { self.device.create_pipeline_layout(&create_info, None).gfx_op("vkCreatePipelineLayout")? };
        self.device.set_object_debug_name(layout, format!("PipelineLayout::{}", name));
        Ok(layout)
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) }
    }

    fn create_graphics_pipeline(
        &self,
        create_info: &GfxGraphicsPipelineCreateInfo,
        layout: vk::PipelineLayout,
        name: &str,
    ) -> GfxResult<vk::Pipeline> {
        let pipeline = create_info.create_pipeline(&self.device, layout)?;
        self.device.set_object_debug_name(pipeline, format!("GraphicsPipeline::{}", name));
        Ok(pipeline)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.device.destroy_pipeline(pipeline, None) }
    }
}
