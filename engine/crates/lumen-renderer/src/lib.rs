//! Lumen 渲染层
//!
//! - [`model`]：将场景描述转换为 GPU 上的 [`model::Model`]，并录制绘制命令
//! - [`frame_scheduler`]：固定数量的 frame slot 轮转，负责 acquire、录制、提交、呈现
//! - [`present`]：基于交换链的 [`lumen_gfx::capability::FrameBackend`] 实现
//! - [`gui`]：imgui 的绘制 pass
//!
//! GPU 相关的逻辑只依赖 `lumen_gfx::capability` 中的 trait，测试中使用 mock 实现。

pub mod error;
pub mod frame_counter;
pub mod frame_scheduler;
pub mod gui;
pub mod model;
pub mod present;

#[cfg(test)]
mod test_support;

pub use error::{FrameError, ModelError};
