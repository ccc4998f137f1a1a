use std::{path::Path, time::Instant};

use anyhow::Context;
use ash::vk;
use lumen_asset::scene::SceneDescription;
use lumen_crate_tools::settings::AppSettings;
use lumen_gfx::{capability::FrameBackend, gfx::Gfx, swapchain::surface::GfxSurface};
use lumen_renderer::{
    frame_scheduler::{FrameOutcome, FrameScheduler},
    gui::{GuiPass, GuiPipelineDesc},
    model::{Model, ModelPipelineDesc},
    present::{RenderPresent, present_mode_from_setting},
};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use winit::event::{ElementState, MouseButton, WindowEvent};

use crate::{
    camera::CameraController,
    gui_host::{FpsCounter, GuiHost, ViewerStats, build_stats_window, wheel_lines},
};

/// 查看器的全部渲染状态
///
/// 字段按照销毁的逆序排列，销毁统一在 [`Viewer::destroy`] 中完成
pub struct Viewer {
    gui_host: GuiHost,
    gui_pass: GuiPass,
    model: Option<Model>,
    scheduler: FrameScheduler<RenderPresent>,
    present: RenderPresent,
    surface: GfxSurface,
    gfx: Gfx,

    camera_controller: CameraController,
    fps_counter: FpsCounter,
    /// 在场景节点的缩放之上再乘以这个值，由 ui 调整
    model_scale: f32,

    window_extent: vk::Extent2D,
    need_recreate: bool,
    last_frame: Instant,
}

// new & init
impl Viewer {
    /// 任何一步失败时，已经创建的对象都会按逆序销毁
    pub fn new(
        raw_display_handle: RawDisplayHandle,
        raw_window_handle: RawWindowHandle,
        window_extent: vk::Extent2D,
        hidpi_factor: f64,
        settings: &AppSettings,
        model_path: Option<&Path>,
    ) -> anyhow::Result<Self> {
        // 追加 window system 需要的 extension，在 windows 下也就是 khr::Surface
        let extra_instance_ext = ash_window::enumerate_required_extensions(raw_display_handle)
            .context("query surface extensions")?;
        let gfx = Gfx::new(&settings.window.title, extra_instance_ext).context("create vulkan context")?;

        let surface = match gfx.create_surface(raw_display_handle, raw_window_handle).context("create surface") {
            Ok(surface) => surface,
            Err(e) => {
                gfx.destroy();
                return Err(e);
            }
        };

        let present = match RenderPresent::new(
            &gfx,
            &surface,
            present_mode_from_setting(settings.render.present_mode),
            window_extent,
            settings.render.clear_color,
        )
        .context("create swapchain")
        {
            Ok(present) => present,
            Err(e) => {
                surface.destroy();
                gfx.destroy();
                return Err(e);
            }
        };

        let scheduler = match FrameScheduler::new(&present).context("create frame slots") {
            Ok(scheduler) => scheduler,
            Err(e) => {
                present.destroy(&gfx);
                surface.destroy();
                gfx.destroy();
                return Err(e);
            }
        };

        let mut gui_host = GuiHost::new(hidpi_factor, [window_extent.width, window_extent.height]);
        let (model, gui_pass) = match create_passes(&gfx, &present, &mut gui_host, model_path) {
            Ok(passes) => passes,
            Err(e) => {
                scheduler.destroy(&present);
                present.destroy(&gfx);
                surface.destroy();
                gfx.destroy();
                return Err(e);
            }
        };

        let mut camera_controller = CameraController::default();
        camera_controller.camera_mut().set_viewport(window_extent.width, window_extent.height);

        Ok(Self {
            gui_host,
            gui_pass,
            model,
            scheduler,
            present,
            surface,
            gfx,
            camera_controller,
            fps_counter: FpsCounter::default(),
            model_scale: 1.0,
            window_extent,
            need_recreate: false,
            last_frame: Instant::now(),
        })
    }
}

/// 上传模型并创建 gui pass；gui pass 创建失败时释放已经上传的模型
fn create_passes(
    gfx: &Gfx,
    present: &RenderPresent,
    gui_host: &mut GuiHost,
    model_path: Option<&Path>,
) -> anyhow::Result<(Option<Model>, GuiPass)> {
    let model = model_path.map(|path| load_model(gfx, present, path)).transpose()?;
    if model.is_none() {
        log::warn!("no model given, only the ui will be drawn");
    }

    let gui_pass = {
        let atlas = gui_host.font_atlas();
        GuiPass::new(gfx, &atlas, &GuiPipelineDesc::new(present.color_format(), present.depth_format()))
    };
    match gui_pass {
        Ok(gui_pass) => {
            gui_host.set_font_texture_id(GuiPass::font_texture_id());
            Ok((model, gui_pass))
        }
        Err(e) => {
            if let Some(model) = model {
                model.destroy(gfx);
            }
            Err(anyhow::Error::new(e).context("create gui pass"))
        }
    }
}

/// 加载场景并上传到 GPU，CPU 侧的场景数据在上传之后释放
fn load_model(gfx: &Gfx, present: &RenderPresent, path: &Path) -> anyhow::Result<Model> {
    let _span = tracy_client::span!("load_model");

    let scene = SceneDescription::load(path).with_context(|| format!("load scene {}", path.display()))?;
    let pipeline_desc = ModelPipelineDesc::new(present.color_format(), present.depth_format());
    let model = Model::load(gfx, &scene, &pipeline_desc);
    scene.destroy();

    let model = model.with_context(|| format!("upload model {}", path.display()))?;
    log::info!(
        "model {} loaded: {} vertices, {} indices, {} primitives",
        model.name(),
        model.vertex_count(),
        model.index_count(),
        model.primitives().len()
    );
    Ok(model)
}

// update
impl Viewer {
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        self.gui_host.handle_event(event);

        match event {
            WindowEvent::Resized(size) => {
                self.window_extent = vk::Extent2D {
                    width: size.width,
                    height: size.height,
                };
                self.need_recreate = true;
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.camera_controller.on_cursor_moved([position.x, position.y]);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                // 松开总是生效，避免拖动状态残留
                let pressed = *state == ElementState::Pressed;
                if !pressed || !self.gui_host.want_capture_mouse() {
                    self.camera_controller.on_left_button(pressed);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !self.gui_host.want_capture_mouse() {
                    self.camera_controller.on_wheel(wheel_lines(delta)[1]);
                }
            }
            _ => {}
        }
    }

    /// 录制、提交并呈现一帧；返回错误时应当终止程序
    pub fn render_frame(&mut self) -> anyhow::Result<()> {
        let _span = tracy_client::span!("render_frame");

        // 最小化时不渲染
        if self.window_extent.width == 0 || self.window_extent.height == 0 {
            return Ok(());
        }
        if self.need_recreate {
            self.recreate_swapchain()?;
        }

        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.fps_counter.tick(delta);

        let extent = self.present.render_extent();
        self.camera_controller.camera_mut().set_viewport(extent.width, extent.height);
        let stats = self.stats(extent);
        let frame_label = self.scheduler.current_label();

        let Self {
            gui_host,
            gui_pass,
            model,
            scheduler,
            present,
            gfx,
            camera_controller,
            model_scale,
            ..
        } = self;

        let draw_data = {
            let _span = tracy_client::span!("build_ui");
            gui_host.frame(delta, |ui| build_stats_window(ui, &stats, model_scale))
        };
        let mvp = model.as_ref().map(|model| {
            let model_matrix = model.model_matrix() * glam::Mat4::from_scale(glam::Vec3::splat(*model_scale));
            camera_controller.camera().mvp(&model_matrix)
        });

        let outcome = {
            let _span = tracy_client::span!("run_frame");
            scheduler.run_frame(present, |cmd| {
                if let (Some(model), Some(mvp)) = (model.as_ref(), mvp) {
                    model.draw(cmd, &mvp);
                }
                gui_pass.draw(&*gfx, cmd, frame_label, draw_data)?;
                Ok(())
            })?
        };

        if matches!(outcome, FrameOutcome::NeedRecreate) {
            self.need_recreate = true;
        }
        Ok(())
    }

    /// 先等待所有 slot 完成，再重建交换链；颜色格式变化时重建 pipeline
    fn recreate_swapchain(&mut self) -> anyhow::Result<()> {
        let _span = tracy_client::span!("recreate_swapchain");

        self.scheduler.drain(&self.present).context("drain frames before swapchain rebuild")?;
        let old_format = self.present.color_format();
        self.present.rebuild(&self.gfx, &self.surface, self.window_extent).context("rebuild swapchain")?;

        let color_format = self.present.color_format();
        if color_format != old_format {
            log::info!("swapchain format changed: {:?} -> {:?}", old_format, color_format);
            if let Some(model) = self.model.as_mut() {
                model
                    .rebuild_pipeline(&self.gfx, &ModelPipelineDesc::new(color_format, self.present.depth_format()))
                    .context("rebuild model pipeline")?;
            }
            self.gui_pass
                .rebuild_pipeline(&self.gfx, &GuiPipelineDesc::new(color_format, self.present.depth_format()))
                .context("rebuild gui pipeline")?;
        }

        self.need_recreate = false;
        Ok(())
    }

    fn stats(&self, extent: vk::Extent2D) -> ViewerStats {
        let mut stats = ViewerStats {
            fps: self.fps_counter.fps(),
            frame_id: self.scheduler.frame_counter().frame_id(),
            extent: [extent.width, extent.height],
            ..Default::default()
        };
        if let Some(model) = &self.model {
            stats.model_name = Some(model.name().to_string());
            stats.vertex_count = model.vertex_count();
            stats.index_count = model.index_count();
            stats.primitive_count = model.primitives().len();
            stats.material_count = model.materials_count();
            stats.texture_count = model.textures_count();
        }
        stats
    }
}

// destroy
impl Viewer {
    pub fn destroy(self) {
        if let Err(e) = self.scheduler.drain(&self.present) {
            log::error!("wait idle before destroy failed: {e}");
        }

        let Self {
            gui_pass,
            model,
            scheduler,
            present,
            surface,
            gfx,
            ..
        } = self;
        gui_pass.destroy(&gfx);
        if let Some(model) = model {
            model.destroy(&gfx);
        }
        scheduler.destroy(&present);
        present.destroy(&gfx);
        surface.destroy();
        gfx.destroy();
        log::info!("viewer destroyed");
    }
}
