use ash::vk;

/// Gfx 关于 submitInfo 的封装，更易用
#[derive(Default)]
pub struct GfxSubmitInfo {
    command_buffers: Vec<vk::CommandBufferSubmitInfo<'static>>,
    wait_infos: Vec<vk::SemaphoreSubmitInfo<'static>>,
    signal_infos: Vec<vk::SemaphoreSubmitInfo<'static>>,
}

impl GfxSubmitInfo {
    pub fn new(commands: &[vk::CommandBuffer]) -> Self {
        Self {
            command_buffers: commands
                .iter()
                .map(|cmd| vk::CommandBufferSubmitInfo::default().command_buffer(*cmd))
                .collect(),
            ..Default::default()
        }
    }

    /// 引用了 self 内部的数组，因此 self 需要活到 submit 结束
    #[inline]
    pub fn submit_info(&self) -> vk::SubmitInfo2<'_> {
        vk::SubmitInfo2::default()
            .command_buffer_infos(&self.command_buffers)
            .wait_semaphore_infos(&self.wait_infos)
            .signal_semaphore_infos(&self.signal_infos)
    }

    /// builder
    #[inline]
    pub fn wait(mut self, semaphore: vk::Semaphore, stage: vk::PipelineStageFlags2) -> Self {
        self.wait_infos.push(vk::SemaphoreSubmitInfo::default().semaphore(semaphore).stage_mask(stage));
        self
    }

    /// builder
    #[inline]
    pub fn signal(mut self, semaphore: vk::Semaphore, stage: vk::PipelineStageFlags2) -> Self {
        self.signal_infos.push(vk::SemaphoreSubmitInfo::default().semaphore(semaphore).stage_mask(stage));
        self
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    #[test]
    fn submit_info_references_all_arrays() {
        let cmd = vk::CommandBuffer::from_raw(1);
        let info = GfxSubmitInfo::new(&[cmd])
            .wait(vk::Semaphore::from_raw(2), vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
            .signal(vk::Semaphore::from_raw(3), vk::PipelineStageFlags2::ALL_COMMANDS);

        let submit = info.submit_info();
        assert_eq!(submit.command_buffer_info_count, 1);
        assert_eq!(submit.wait_semaphore_info_count, 1);
        assert_eq!(submit.signal_semaphore_info_count, 1);
        assert_eq!(info.wait_infos[0].stage_mask, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(info.signal_infos[0].semaphore, vk::Semaphore::from_raw(3));
    }
}
