//! Lumen 工具集
//!
//! 提供日志初始化、资源路径管理、应用配置加载等通用工具。
//!
//! # LumenPath
//! 基于工作区根目录的统一路径管理，避免硬编码相对路径。
//!
//! # AppSettings
//! 从 `lumen.toml` 读取窗口、场景、渲染相关的配置，缺省字段使用默认值。

pub mod init_log;
pub mod resource;
pub mod settings;
