//! Lumen 资源层
//!
//! - [`texture_codec`]：`.ltex` 压缩纹理容器的编码与解码
//! - [`scene`]：场景描述文件（json + bin）的解析与校验
//!
//! 这一层只负责 CPU 侧的数据，GPU 上传由 `lumen-renderer` 完成。

pub mod error;
pub mod scene;
pub mod texture_codec;

pub use error::{AssetError, AssetErrorKind, AssetResult};
