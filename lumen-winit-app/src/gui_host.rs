use std::time::Duration;

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};

/// 显示在调试窗口中的统计信息
#[derive(Debug, Clone, Default)]
pub struct ViewerStats {
    pub fps: f32,
    pub frame_id: u64,
    pub extent: [u32; 2],
    pub model_name: Option<String>,
    pub vertex_count: u32,
    pub index_count: u32,
    pub primitive_count: usize,
    pub material_count: usize,
    pub texture_count: usize,
}

/// 每隔一段时间统计一次帧率，避免数字跳动
#[derive(Debug, Default)]
pub struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    fps: f32,
}
impl FpsCounter {
    const WINDOW: Duration = Duration::from_millis(500);

    pub fn tick(&mut self, delta: Duration) {
        self.elapsed += delta;
        self.frames += 1;
        if self.elapsed >= Self::WINDOW {
            self.fps = self.frames as f32 / self.elapsed.as_secs_f32();
            self.elapsed = Duration::ZERO;
            self.frames = 0;
        }
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// imgui context 以及 winit 输入到 imgui 的转发
pub struct GuiHost {
    imgui_ctx: imgui::Context,
}

// new & init
impl GuiHost {
    pub fn new(hidpi_factor: f64, display_size: [u32; 2]) -> Self {
        let mut imgui_ctx = imgui::Context::create();
        // disable automatic saving .ini file
        imgui_ctx.set_ini_filename(None);

        {
            let style = imgui_ctx.style_mut();
            style.use_dark_colors();
            // WindowBg: 半透明深色背景
            style.colors[imgui::StyleColor::WindowBg as usize] = [0.1, 0.1, 0.1, 0.9];
        }

        let font_size = (13.0 * hidpi_factor) as f32;
        imgui_ctx.fonts().add_font(&[imgui::FontSource::DefaultFontData {
            config: Some(imgui::FontConfig {
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);
        imgui_ctx.io_mut().display_size = [display_size[0] as f32, display_size[1] as f32];

        Self { imgui_ctx }
    }

    /// 构建字体纹理，返回的像素需要上传到 GPU
    pub fn font_atlas(&mut self) -> imgui::FontAtlasTexture<'_> {
        self.imgui_ctx.fonts().build_rgba32_texture()
    }

    pub fn set_font_texture_id(&mut self, texture_id: imgui::TextureId) {
        self.imgui_ctx.fonts().tex_id = texture_id;
    }
}

// update
impl GuiHost {
    pub fn handle_event(&mut self, event: &WindowEvent) {
        let io = self.imgui_ctx.io_mut();
        match event {
            WindowEvent::Resized(size) => {
                io.display_size = [size.width as f32, size.height as f32];
            }
            WindowEvent::CursorMoved { position, .. } => {
                io.add_mouse_pos_event([position.x as f32, position.y as f32]);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    winit::event::MouseButton::Left => Some(imgui::MouseButton::Left),
                    winit::event::MouseButton::Right => Some(imgui::MouseButton::Right),
                    winit::event::MouseButton::Middle => Some(imgui::MouseButton::Middle),
                    _ => None,
                };
                if let Some(button) = button {
                    io.add_mouse_button_event(button, *state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let [h, v] = wheel_lines(delta);
                io.add_mouse_wheel_event([h, v]);
            }
            _ => {}
        }
    }

    /// 鼠标位于 imgui 窗口上时，输入不应该再交给相机
    #[inline]
    pub fn want_capture_mouse(&self) -> bool {
        self.imgui_ctx.io().want_capture_mouse
    }

    /// 开始新的一帧，构建 ui，返回这一帧的 draw data
    pub fn frame(&mut self, delta: Duration, build_ui: impl FnOnce(&imgui::Ui)) -> &imgui::DrawData {
        self.imgui_ctx.io_mut().update_delta_time(delta);
        let ui = self.imgui_ctx.new_frame();
        build_ui(ui);
        self.imgui_ctx.render()
    }
}

/// 统计信息和模型缩放
pub fn build_stats_window(ui: &imgui::Ui, stats: &ViewerStats, model_scale: &mut f32) {
    ui.window("Lumen")
        .position([10.0, 10.0], imgui::Condition::FirstUseEver)
        .size([280.0, 220.0], imgui::Condition::FirstUseEver)
        .build(|| {
            ui.text(format!("FPS: {:.1}", stats.fps));
            ui.text(format!("frame: {}", stats.frame_id));
            ui.text(format!("extent: {}x{}", stats.extent[0], stats.extent[1]));
            ui.separator();

            match &stats.model_name {
                Some(name) => {
                    ui.text(format!("model: {name}"));
                    ui.text(format!("vertices: {}", stats.vertex_count));
                    ui.text(format!("indices: {}", stats.index_count));
                    ui.text(format!("primitives: {}", stats.primitive_count));
                    ui.text(format!("materials: {}", stats.material_count));
                    ui.text(format!("textures: {}", stats.texture_count));
                    ui.slider("scale", 0.01, 10.0, model_scale);
                }
                None => ui.text("no model loaded"),
            }
        });
}

/// 返回 [水平, 垂直] 的滚轮格数
pub fn wheel_lines(delta: &MouseScrollDelta) -> [f32; 2] {
    match delta {
        MouseScrollDelta::LineDelta(h, v) => [*h, *v],
        // 触控板按像素滚动，粗略换算为格数
        MouseScrollDelta::PixelDelta(pos) => [(pos.x / 100.0) as f32, (pos.y / 100.0) as f32],
    }
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;

    use super::*;

    #[test]
    fn fps_is_averaged_over_the_window() {
        let mut counter = FpsCounter::default();
        for _ in 0..29 {
            counter.tick(Duration::from_millis(16));
        }
        assert_eq!(counter.fps(), 0.0);

        // 30 帧，共 510ms
        counter.tick(Duration::from_millis(46));
        assert!((counter.fps() - 30.0 / 0.51).abs() < 0.01);
    }

    #[test]
    fn pixel_scroll_is_scaled_to_lines() {
        assert_eq!(wheel_lines(&MouseScrollDelta::LineDelta(0.0, -2.0)), [0.0, -2.0]);
        assert_eq!(wheel_lines(&MouseScrollDelta::PixelDelta(PhysicalPosition::new(50.0, 300.0))), [0.5, 3.0]);
    }
}
