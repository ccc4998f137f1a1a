//! 交换链呈现
pub mod render_present;

pub use render_present::{RenderPresent, present_mode_from_setting};
