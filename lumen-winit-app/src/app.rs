use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use ash::vk;
use lumen_crate_tools::settings::AppSettings;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::viewer::Viewer;

pub fn panic_handler(info: &std::panic::PanicHookInfo) {
    log::error!("{}", info);
}

pub struct WinitApp {
    settings: AppSettings,
    model_path: Option<PathBuf>,

    /// 需要在 window 之前销毁
    viewer: Option<Viewer>,
    window: Option<Window>,

    failed: bool,
}
// 总的 main 函数
impl WinitApp {
    /// 运行事件循环直到窗口关闭或者发生致命错误
    pub fn run(settings: AppSettings, model_path: Option<PathBuf>) -> ExitCode {
        let event_loop = match EventLoop::new() {
            Ok(event_loop) => event_loop,
            Err(e) => {
                log::error!("create event loop: {e}");
                return ExitCode::FAILURE;
            }
        };

        let mut app = Self {
            settings,
            model_path,
            viewer: None,
            window: None,
            failed: false,
        };

        if let Err(e) = event_loop.run_app(&mut app) {
            log::error!("event loop: {e}");
            app.failed = true;
        }
        log::info!("end run.");

        let failed = app.failed;
        app.destroy();
        if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
    }
}
// new & init
impl WinitApp {
    /// 在 window 创建之后调用，初始化 Viewer
    fn init_after_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attr = Window::default_attributes()
            .with_title(self.settings.window.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(self.settings.window.width, self.settings.window.height));
        let window = event_loop.create_window(window_attr).context("create window")?;

        let size = window.inner_size();
        let viewer = Viewer::new(
            window.display_handle().context("display handle")?.as_raw(),
            window.window_handle().context("window handle")?.as_raw(),
            vk::Extent2D {
                width: size.width,
                height: size.height,
            },
            window.scale_factor(),
            &self.settings,
            self.model_path.as_deref(),
        )?;

        self.viewer = Some(viewer);
        self.window = Some(window);
        Ok(())
    }

    /// 所有的错误都是致命的：输出一行日志，然后退出事件循环
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        log::error!("{e:#}");
        self.failed = true;
        event_loop.exit();
    }
}
// destroy
impl WinitApp {
    fn destroy(mut self) {
        if let Some(viewer) = self.viewer.take() {
            viewer.destroy();
        }
        self.window = None;
    }
}
// 各种 winit 的事件处理
impl ApplicationHandler for WinitApp {
    // 建议在这里创建 window 和 Viewer
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        log::info!("winit event: resumed");
        if self.window.is_some() || self.failed {
            return;
        }

        if let Err(e) = self.init_after_window(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = viewer.render_frame() {
                    self.fail(event_loop, e);
                }
            }
            event => viewer.handle_window_event(&event),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        log::warn!("winit event: suspended");
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("loop exiting");
    }
}
