use ash::vk;
use lumen_gfx::{
    GfxResult,
    capability::{AcquireOutcome, FrameBackend, PresentOutcome},
};

use crate::{
    error::FrameError,
    frame_counter::{FrameCounter, FrameLabel},
};

/// 单个 frame slot 的状态
///
/// `Idle -> Acquired -> Recorded -> Submitted -> Idle`，
/// 回到 Idle 时 GPU 可能仍在执行，下一次 acquire 会等待 fence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Acquired { image_index: u32 },
    Recorded { image_index: u32 },
    Submitted { image_index: u32 },
}
impl SlotState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Acquired { .. } => "Acquired",
            Self::Recorded { .. } => "Recorded",
            Self::Submitted { .. } => "Submitted",
        }
    }
}

/// 一帧完整执行之后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// 交换链需要重建；acquire 失败时这一帧没有被录制
    NeedRecreate,
}

/// 每个 slot 独占的同步原语和 command buffer
struct FrameSlot<B: FrameBackend> {
    command_buffer: B::CommandBuffer,
    /// 交换链图像可用时 signal
    present_ready: B::Semaphore,
    /// 渲染完成时 signal，present 等待它
    render_complete: B::Semaphore,
    /// 创建时就是 signaled，第一次 acquire 不会阻塞
    fence: B::Fence,
    state: SlotState,
}

/// 固定 [`FrameCounter::fif_count`] 个 slot 的帧调度
///
/// 第 `frame_id` 帧使用 `frame_id mod N` 号 slot。
/// CPU 最多领先 GPU N 帧：slot 的 fence 在下一次轮到它 acquire 时才等待。
pub struct FrameScheduler<B: FrameBackend> {
    slots: Vec<FrameSlot<B>>,
    frame_counter: FrameCounter,
}

// new & init
impl<B: FrameBackend> FrameScheduler<B> {
    pub fn new(backend: &B) -> GfxResult<Self> {
        let slots = FrameCounter::frame_labels()
            .iter()
            .map(|label| {
                Ok(FrameSlot {
                    command_buffer: backend.allocate_command_buffer(&format!("frame-{label}"))?,
                    present_ready: backend.create_semaphore(&format!("present-ready-{label}"))?,
                    render_complete: backend.create_semaphore(&format!("render-complete-{label}"))?,
                    fence: backend.create_fence(true, &format!("frame-fence-{label}"))?,
                    state: SlotState::Idle,
                })
            })
            .collect::<GfxResult<Vec<_>>>()?;

        log::info!("frame scheduler created with {} slots", slots.len());
        Ok(Self {
            slots,
            frame_counter: FrameCounter::new(0),
        })
    }
}

// getters
impl<B: FrameBackend> FrameScheduler<B> {
    #[inline]
    pub fn frame_counter(&self) -> &FrameCounter {
        &self.frame_counter
    }

    #[inline]
    pub fn current_label(&self) -> FrameLabel {
        self.frame_counter.frame_label()
    }

    #[inline]
    pub fn slot_state(&self, label: FrameLabel) -> SlotState {
        self.slots[label.index()].state
    }
}

// update
impl<B: FrameBackend> FrameScheduler<B> {
    /// 等待当前 slot 的 fence，然后获取下一张交换链图像
    ///
    /// fence 只在成功获取图像之后才 reset；交换链失效时返回 `None`，slot 保持 Idle，
    /// 重建交换链之后可以直接再次 acquire
    pub fn acquire(&mut self, backend: &mut B) -> Result<Option<u32>, FrameError> {
        let slot_index = self.current_label().index();
        let slot = &mut self.slots[slot_index];
        if slot.state != SlotState::Idle {
            return Err(protocol_error(slot_index, "Idle", slot.state));
        }

        backend.wait_fence(&slot.fence)?;

        match backend.acquire_next_image(&slot.present_ready)? {
            AcquireOutcome::OutOfDate => {
                log::debug!("{} swapchain out of date on acquire", self.frame_counter.frame_name());
                Ok(None)
            }
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            } => {
                if suboptimal {
                    log::debug!("{} swapchain suboptimal on acquire", self.frame_counter.frame_name());
                }
                backend.reset_fence(&slot.fence)?;
                slot.state = SlotState::Acquired { image_index };
                Ok(Some(image_index))
            }
        }
    }

    /// 录制当前 slot 的 command buffer
    ///
    /// `draw` 在 dynamic rendering 的范围内被调用，viewport 和 scissor 已经覆盖整个交换链图像
    pub fn record<F>(&mut self, backend: &B, draw: F) -> Result<(), FrameError>
    where
        F: FnOnce(&B::CommandBuffer) -> Result<(), FrameError>,
    {
        let frame_name = self.frame_counter.frame_name();
        let slot_index = self.current_label().index();
        let slot = &mut self.slots[slot_index];
        let SlotState::Acquired { image_index } = slot.state else {
            return Err(protocol_error(slot_index, "Acquired", slot.state));
        };

        backend.begin_commands(&slot.command_buffer, &frame_name)?;
        backend.begin_rendering(&slot.command_buffer, image_index);
        let drawn = draw(&slot.command_buffer);
        backend.end_rendering(&slot.command_buffer, image_index);
        backend.end_commands(&slot.command_buffer)?;
        drawn?;

        slot.state = SlotState::Recorded { image_index };
        Ok(())
    }

    /// 提交到 graphics queue
    ///
    /// 在 COLOR_ATTACHMENT_OUTPUT 阶段等待图像可用，顶点阶段的工作可以提前执行
    pub fn submit(&mut self, backend: &B) -> Result<(), FrameError> {
        let slot_index = self.current_label().index();
        let slot = &mut self.slots[slot_index];
        let SlotState::Recorded { image_index } = slot.state else {
            return Err(protocol_error(slot_index, "Recorded", slot.state));
        };

        backend.submit(
            &slot.command_buffer,
            &slot.present_ready,
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            &slot.render_complete,
            &slot.fence,
        )?;

        slot.state = SlotState::Submitted { image_index };
        Ok(())
    }

    /// 等待渲染完成后呈现，然后进入下一帧
    pub fn present(&mut self, backend: &mut B) -> Result<PresentOutcome, FrameError> {
        let slot_index = self.current_label().index();
        let slot = &mut self.slots[slot_index];
        let SlotState::Submitted { image_index } = slot.state else {
            return Err(protocol_error(slot_index, "Submitted", slot.state));
        };

        let outcome = backend.present(image_index, &slot.render_complete)?;
        if outcome != PresentOutcome::Presented {
            log::debug!("{} present reported {:?}", self.frame_counter.frame_name(), outcome);
        }

        slot.state = SlotState::Idle;
        self.frame_counter.next_frame();
        Ok(outcome)
    }

    /// acquire -> record -> submit -> present
    pub fn run_frame<F>(&mut self, backend: &mut B, draw: F) -> Result<FrameOutcome, FrameError>
    where
        F: FnOnce(&B::CommandBuffer) -> Result<(), FrameError>,
    {
        if self.acquire(backend)?.is_none() {
            return Ok(FrameOutcome::NeedRecreate);
        }
        self.record(backend, draw)?;
        self.submit(backend)?;

        if self.present(backend)?.need_recreate() {
            Ok(FrameOutcome::NeedRecreate)
        } else {
            Ok(FrameOutcome::Presented)
        }
    }

    /// 等待 GPU 完全空闲，销毁任何资源或者重建交换链之前都需要调用
    pub fn drain(&self, backend: &B) -> GfxResult<()> {
        backend.wait_idle()
    }
}

// destroy
impl<B: FrameBackend> FrameScheduler<B> {
    /// 调用前需要先 [`Self::drain`]
    pub fn destroy(self, backend: &B) {
        for slot in self.slots {
            backend.free_command_buffer(slot.command_buffer);
            backend.destroy_semaphore(slot.present_ready);
            backend.destroy_semaphore(slot.render_complete);
            backend.destroy_fence(slot.fence);
        }
        log::info!("frame scheduler destroyed at frame {}", self.frame_counter.frame_id());
    }
}

fn protocol_error(slot: usize, expected: &'static str, found: SlotState) -> FrameError {
    FrameError::Protocol {
        slot,
        expected,
        found: found.name(),
    }
}
