use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// 编译期确定的 frames in flight 数量
pub const FRAMES_IN_FLIGHT: usize = 2;

/// 应用配置，对应 `lumen.toml`
///
/// 所有字段都有默认值，配置文件中只需要写出需要覆盖的部分
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub window: WindowSettings,
    pub scene: SceneSettings,
    pub render: RenderSettings,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// 场景描述文件，相对路径基于 `assets/`
    pub model: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub present_mode: PresentModeSetting,
    pub clear_color: [f32; 4],
    pub frames_in_flight: usize,
    /// 配置文件中的 frames_in_flight 被重置过
    #[serde(skip)]
    pub frames_in_flight_overridden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentModeSetting {
    #[default]
    Fifo,
    Mailbox,
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Lumen".to_string(),
            width: 1280,
            height: 720,
        }
    }
}
impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            present_mode: PresentModeSetting::default(),
            clear_color: [0.1, 0.1, 0.12, 1.0],
            frames_in_flight: FRAMES_IN_FLIGHT,
            frames_in_flight_overridden: false,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

// load
impl AppSettings {
    /// 从 toml 文本解析配置
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let mut settings: Self = toml::from_str(text).context("failed to parse settings")?;
        settings.sanitize();
        Ok(settings)
    }

    /// 读取配置文件；文件不存在时返回默认配置，文件格式错误时返回错误
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid settings file {}", path.display()))
    }

    /// frames in flight 是编译期常量，配置中的其他值会被重置
    ///
    /// logger 此时可能还没有初始化，所以只修正数值，由调用方决定是否输出警告
    fn sanitize(&mut self) {
        if self.render.frames_in_flight != FRAMES_IN_FLIGHT {
            self.render.frames_in_flight = FRAMES_IN_FLIGHT;
            self.render.frames_in_flight_overridden = true;
        }
    }
}
