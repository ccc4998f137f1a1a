//! Vulkan 封装层
//!
//! 提供对 Vulkan API 的封装：实例、设备、命令、同步、资源、管线、交换链。
//!
//! 所有 Vulkan 调用都通过显式传递的 [`gfx::Gfx`] 完成，不存在全局状态。
//! 上层（模型上传、帧调度）只依赖 [`capability`] 中的 trait，
//! 因此可以在没有 GPU 的环境下用 mock 实现进行测试。

pub mod capability;
pub mod commands;
pub mod error;
pub mod foundation;
pub mod gfx;
pub mod pipelines;
pub mod resources;
pub mod swapchain;

pub use error::{GfxError, GfxResult, VkResultExt};
