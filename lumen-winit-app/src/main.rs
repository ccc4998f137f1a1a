use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use lumen_crate_tools::{
    init_log::init_log,
    resource::LumenPath,
    settings::{AppSettings, FRAMES_IN_FLIGHT},
};
use lumen_winit_app::app::{WinitApp, panic_handler};

/// 加载一个场景文件并在窗口中显示
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// 场景描述文件（json），缺省时使用配置文件中的 `scene.model`
    model: Option<PathBuf>,

    /// 配置文件路径，缺省为工作区根目录下的 `lumen.toml`
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    std::panic::set_hook(Box::new(panic_handler));

    let settings_path = cli.settings.unwrap_or_else(LumenPath::settings_path);
    let settings = match AppSettings::load_or_default(&settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            init_log(log::LevelFilter::Info);
            log::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    init_log(settings.log_level.into());
    if settings.render.frames_in_flight_overridden {
        log::warn!("frames_in_flight in {} is ignored, it is fixed to {FRAMES_IN_FLIGHT}", settings_path.display());
    }

    tracy_client::Client::start();
    tracy_client::set_thread_name!("LumenMain");

    // 命令行给出的路径相对于当前目录，配置文件中的路径相对于 assets/
    let model_path = cli.model.or_else(|| settings.scene.model.as_ref().map(LumenPath::assets_path));

    WinitApp::run(settings, model_path)
}
