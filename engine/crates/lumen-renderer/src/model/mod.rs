//! 场景描述到 GPU 模型的转换
//!
//! 1. [`geometry`]：合并所有 primitive 的顶点和 index，index 加上 primitive 的起始顶点
//! 2. [`upload`]：staging buffer 上传，纹理直接解压到 staging 内存
//! 3. [`gpu_model`]：材质的绑定对象、pipeline 以及每帧的绘制

pub mod geometry;
pub mod gpu_model;
pub mod upload;
pub mod vertex;

pub use geometry::{Geometry, ModelPrimitive, build_geometry};
pub use gpu_model::{Model, ModelMaterial, ModelPipelineDesc};
pub use vertex::Vertex;
