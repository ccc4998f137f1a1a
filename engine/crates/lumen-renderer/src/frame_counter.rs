use std::fmt::Display;

use lumen_crate_tools::settings::FRAMES_IN_FLIGHT;

/// frame slot 的标签，用于 debug name 和日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLabel {
    A,
    B,
}
impl Display for FrameLabel {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}
impl FrameLabel {
    #[inline]
    pub fn from_usize(idx: usize) -> Self {
        match idx {
            0 => Self::A,
            1 => Self::B,
            _ => panic!("Invalid frame index: {idx}"),
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

pub struct FrameCounter {
    /// 当前的帧序号，一直累加
    frame_id: u64,
}
// new & init
impl FrameCounter {
    pub fn new(init_frame_id: u64) -> Self {
        Self { frame_id: init_frame_id }
    }
}
// update
impl FrameCounter {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    const FIF_COUNT: usize = FRAMES_IN_FLIGHT;

    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
    #[inline]
    pub const fn fif_count() -> usize {
        Self::FIF_COUNT
    }
    #[inline]
    pub const fn frame_labels() -> [FrameLabel; Self::FIF_COUNT] {
        [FrameLabel::A, FrameLabel::B]
    }
    /// 当前帧使用的 slot：`frame_id mod N`
    #[inline]
    pub fn frame_label(&self) -> FrameLabel {
        FrameLabel::from_usize((self.frame_id % Self::FIF_COUNT as u64) as usize)
    }
    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}{}]", self.frame_id, self.frame_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_alternate() {
        let mut counter = FrameCounter::new(0);
        let mut labels = Vec::new();
        for _ in 0..5 {
            labels.push(counter.frame_label());
            counter.next_frame();
        }
        assert_eq!(labels, [FrameLabel::A, FrameLabel::B, FrameLabel::A, FrameLabel::B, FrameLabel::A]);
        assert_eq!(counter.frame_name(), "[F5B]");
    }

    #[test]
    fn wraps_without_panic() {
        let mut counter = FrameCounter::new(u64::MAX);
        assert_eq!(counter.frame_label(), FrameLabel::B);
        counter.next_frame();
        assert_eq!(counter.frame_id(), 0);
        assert_eq!(counter.frame_label(), FrameLabel::A);
    }
}
