use std::mem::offset_of;

use ash::vk;

/// AoS，与 `imgui::DrawVert` 的内存布局一致
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GuiVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    /// R8G8B8A8
    pub color: [u8; 4],
}

impl From<&imgui::DrawVert> for GuiVertex {
    #[inline]
    fn from(vert: &imgui::DrawVert) -> Self {
        Self {
            pos: vert.pos,
            uv: vert.uv,
            color: vert.col,
        }
    }
}

impl GuiVertex {
    pub fn vertex_input_bindings() -> Vec<vk::VertexInputBindingDescription> {
        vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    }

    pub fn vertex_input_attributes() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Self, pos) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Self, uv) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 2,
                binding: 0,
                format: vk::Format::R8G8B8A8_UNORM,
                offset: offset_of!(Self, color) as u32,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_imgui_draw_vert() {
        assert_eq!(size_of::<GuiVertex>(), size_of::<imgui::DrawVert>());
        assert_eq!(GuiVertex::vertex_input_bindings()[0].stride, 20);

        let offsets: Vec<u32> = GuiVertex::vertex_input_attributes().iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 8, 16]);

        let vert = imgui::DrawVert {
            pos: [1.0, 2.0],
            uv: [0.25, 0.75],
            col: [10, 20, 30, 255],
        };
        assert_eq!(GuiVertex::from(&vert).color, [10, 20, 30, 255]);
    }
}
