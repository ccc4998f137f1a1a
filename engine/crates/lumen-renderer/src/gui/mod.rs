//! 调试 GUI：imgui 的 vulkan 后端
//!
//! 与模型绘制处在同一个 dynamic rendering 中，在模型之后绘制。

pub mod gui_mesh;
pub mod gui_pass;
pub mod gui_vertex;

pub use gui_mesh::GuiMesh;
pub use gui_pass::{GuiPass, GuiPipelineDesc, clip_rect_to_scissor};
pub use gui_vertex::GuiVertex;
