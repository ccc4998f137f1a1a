//! 场景描述：一个 json 描述文件加一个同名的 `.bin` 二进制 blob
//!
//! 只支持一个 mesh、一个带 scale 的 node。所有引用在加载时校验，
//! accessor 的字节范围在真正读取时校验（见 [`SceneDescription::accessor_view`]）。

mod description;
mod loader;
mod raw;
mod types;

pub use description::{AccessorView, SceneDescription};
pub use types::{
    Accessor, AccessorType, AlphaMode, BufferView, ComponentType, ImageRef, Material, MimeType, Primitive,
    PrimitiveAttributes, PrimitiveTopology, TextureRef,
};

/// 场景二进制 blob 的扩展名
pub const BLOB_EXTENSION: &str = "bin";
