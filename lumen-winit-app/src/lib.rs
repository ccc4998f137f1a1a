//! Lumen 模型查看器
//!
//! winit 窗口、轨道相机以及 imgui 调试界面，渲染由 `lumen-renderer` 完成。

pub mod app;
pub mod camera;
pub mod gui_host;
pub mod viewer;
