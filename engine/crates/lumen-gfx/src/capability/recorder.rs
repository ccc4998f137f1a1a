use ash::vk;

/// 在一个处于录制状态的 command buffer 中录制绘制命令
pub trait DrawRecorder {
    fn bind_graphics_pipeline(&self, pipeline: vk::Pipeline);

    fn set_viewport(&self, viewport: vk::Viewport);

    fn set_scissor(&self, scissor: vk::Rect2D);

    fn bind_vertex_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize);

    fn bind_index_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType);

    fn bind_descriptor_set(&self, layout: vk::PipelineLayout, set_index: u32, set: vk::DescriptorSet);

    fn push_constants(&self, layout: vk::PipelineLayout, stages: vk::ShaderStageFlags, offset: u32, data: &[u8]);

    fn draw_indexed(&self, index_count: u32, first_index: u32, vertex_offset: i32);
}
