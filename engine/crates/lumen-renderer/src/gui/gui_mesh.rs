use ash::vk;
use lumen_gfx::{
    GfxError, GfxResult,
    capability::GpuAllocator,
    resources::buffer::{GfxBuffer, MemoryIntent},
};

use crate::{frame_counter::FrameLabel, gui::gui_vertex::GuiVertex};

/// imgui 绘制所需的 vertex buffer 和 index buffer，每个 frame slot 一份
///
/// 内存是 host coherent 的，每帧由 CPU 直接写入。
/// 只有在对应 slot 的 fence 被 signal 之后才能写入或者增长
pub struct GuiMesh {
    vertex_buffer: GfxBuffer,
    vertex_capacity: usize,

    index_buffer: GfxBuffer,
    index_capacity: usize,

    frame_label: FrameLabel,
}

// new & init
impl GuiMesh {
    /// 64KB
    const INIT_VERTEX_CAPACITY: usize = 64 * 1024 / size_of::<GuiVertex>();
    /// 96KB
    const INIT_INDEX_CAPACITY: usize = 96 * 1024 / size_of::<imgui::DrawIdx>();

    pub fn new(ctx: &impl GpuAllocator, frame_label: FrameLabel) -> GfxResult<Self> {
        let vertex_buffer = Self::new_vertex_buffer(ctx, frame_label, Self::INIT_VERTEX_CAPACITY)?;
        let index_buffer = match Self::new_index_buffer(ctx, frame_label, Self::INIT_INDEX_CAPACITY) {
            Ok(buffer) => buffer,
            Err(e) => {
                ctx.destroy_buffer(vertex_buffer);
                return Err(e);
            }
        };

        Ok(Self {
            vertex_buffer,
            vertex_capacity: Self::INIT_VERTEX_CAPACITY,
            index_buffer,
            index_capacity: Self::INIT_INDEX_CAPACITY,
            frame_label,
        })
    }

    fn new_vertex_buffer(ctx: &impl GpuAllocator, frame_label: FrameLabel, capacity: usize) -> GfxResult<GfxBuffer> {
        ctx.create_buffer(
            (capacity * size_of::<GuiVertex>()) as vk::DeviceSize,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            MemoryIntent::HostCoherent,
            &format!("imgui-vertex-{frame_label}"),
        )
    }

    fn new_index_buffer(ctx: &impl GpuAllocator, frame_label: FrameLabel, capacity: usize) -> GfxResult<GfxBuffer> {
        ctx.create_buffer(
            (capacity * size_of::<imgui::DrawIdx>()) as vk::DeviceSize,
            vk::BufferUsageFlags::INDEX_BUFFER,
            MemoryIntent::HostCoherent,
            &format!("imgui-index-{frame_label}"),
        )
    }
}

// getters
impl GuiMesh {
    #[inline]
    pub fn vertex_buffer(&self) -> &GfxBuffer {
        &self.vertex_buffer
    }
    #[inline]
    pub fn index_buffer(&self) -> &GfxBuffer {
        &self.index_buffer
    }
    #[inline]
    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }
    #[inline]
    pub fn index_capacity(&self) -> usize {
        self.index_capacity
    }
}

// update
impl GuiMesh {
    /// 容量不足时增长到下一个 2 的幂，旧的 buffer 直接销毁
    pub fn grow_if_needed(&mut self, ctx: &impl GpuAllocator, vertex_count: usize, index_count: usize) -> GfxResult<()> {
        if vertex_count > self.vertex_capacity {
            let capacity = vertex_count.next_power_of_two();
            let buffer = Self::new_vertex_buffer(ctx, self.frame_label, capacity)?;
            ctx.destroy_buffer(std::mem::replace(&mut self.vertex_buffer, buffer));
            self.vertex_capacity = capacity;
            log::debug!("imgui vertex buffer {} grown to {} vertices", self.frame_label, capacity);
        }

        if index_count > self.index_capacity {
            let capacity = index_count.next_power_of_two();
            let buffer = Self::new_index_buffer(ctx, self.frame_label, capacity)?;
            ctx.destroy_buffer(std::mem::replace(&mut self.index_buffer, buffer));
            self.index_capacity = capacity;
            log::debug!("imgui index buffer {} grown to {} indices", self.frame_label, capacity);
        }
        Ok(())
    }

    /// 写入所有 draw list 合并之后的顶点和索引
    pub fn fill(&mut self, ctx: &impl GpuAllocator, vertices: &[GuiVertex], indices: &[imgui::DrawIdx]) -> GfxResult<()> {
        self.grow_if_needed(ctx, vertices.len(), indices.len())?;

        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        ctx.write_buffer(&self.vertex_buffer, |dst| {
            dst[..vertex_bytes.len()].copy_from_slice(vertex_bytes);
            Ok::<(), GfxError>(())
        })?;

        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        ctx.write_buffer(&self.index_buffer, |dst| {
            dst[..index_bytes.len()].copy_from_slice(index_bytes);
            Ok::<(), GfxError>(())
        })
    }
}

// destroy
impl GuiMesh {
    pub fn destroy(self, ctx: &impl GpuAllocator) {
        ctx.destroy_buffer(self.vertex_buffer);
        ctx.destroy_buffer(self.index_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockGpu;

    fn vertex(i: usize) -> GuiVertex {
        GuiVertex {
            pos: [i as f32, 0.0],
            uv: [0.0, 0.0],
            color: [255; 4],
        }
    }

    #[test]
    fn small_frames_reuse_the_initial_buffers() {
        let gpu = MockGpu::new();
        let mut mesh = GuiMesh::new(&gpu, FrameLabel::B).unwrap();

        let vertices: Vec<GuiVertex> = (0..3).map(vertex).collect();
        mesh.fill(&gpu, &vertices, &[0, 1, 2]).unwrap();

        assert_eq!(gpu.count("create_buffer:imgui-vertex-B"), 1);
        assert_eq!(gpu.count("create_buffer:imgui-index-B"), 1);
        let written = gpu.buffer_contents(mesh.vertex_buffer());
        assert_eq!(&written[..60], bytemuck::cast_slice::<GuiVertex, u8>(&vertices));
        let indices = gpu.buffer_contents(mesh.index_buffer());
        assert_eq!(&indices[..6], bytemuck::cast_slice::<u16, u8>(&[0, 1, 2]));

        mesh.destroy(&gpu);
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn growth_rounds_up_to_a_power_of_two() {
        let gpu = MockGpu::new();
        let mut mesh = GuiMesh::new(&gpu, FrameLabel::A).unwrap();
        let initial = mesh.vertex_capacity();

        let vertices: Vec<GuiVertex> = (0..initial + 1).map(vertex).collect();
        mesh.fill(&gpu, &vertices, &[0]).unwrap();

        assert_eq!(mesh.vertex_capacity(), (initial + 1).next_power_of_two());
        assert_eq!(mesh.index_capacity(), GuiMesh::INIT_INDEX_CAPACITY);
        assert_eq!(gpu.count("destroy_buffer:imgui-vertex-A"), 1);
        assert_eq!(gpu.live_count(), 2);

        let written = gpu.buffer_contents(mesh.vertex_buffer());
        let last = &written[initial * 20..(initial + 1) * 20];
        assert_eq!(last, bytemuck::bytes_of(&vertex(initial)));

        mesh.destroy(&gpu);
    }
}
