//! 描述文件在 json 中的原始形状，只在 loader 内部使用

use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawDocument {
    pub buffer_views: Vec<RawBufferView>,
    pub accessors: Vec<RawAccessor>,
    pub nodes: Vec<RawNode>,
    pub meshes: Vec<RawMesh>,
    pub images: Vec<RawImage>,
    pub textures: Vec<RawTexture>,
    pub materials: Vec<RawMaterial>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawBufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(default)]
    pub byte_stride: Option<usize>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawAccessor {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub count: usize,
    pub component_type: u32,
    #[serde(rename = "type")]
    pub element_type: String,
}

#[derive(Deserialize, Debug)]
pub(super) struct RawNode {
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
}

#[derive(Deserialize, Debug)]
pub(super) struct RawMesh {
    pub primitives: Vec<RawPrimitive>,
}

#[derive(Deserialize, Debug)]
pub(super) struct RawPrimitive {
    pub attributes: RawAttributes,
    pub indices: usize,
    #[serde(default)]
    pub material: Option<usize>,
    #[serde(default)]
    pub mode: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub(super) struct RawAttributes {
    #[serde(rename = "POSITION")]
    pub position: usize,
    #[serde(rename = "NORMAL", default)]
    pub normal: Option<usize>,
    #[serde(rename = "TEXCOORD_0", default)]
    pub texcoord0: Option<usize>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawImage {
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(super) struct RawTexture {
    pub source: usize,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawMaterial {
    #[serde(default)]
    pub alpha_mode: Option<String>,
    pub pbr_metallic_roughness: RawPbr,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawPbr {
    pub base_color_texture: RawTextureInfo,
}

#[derive(Deserialize, Debug)]
pub(super) struct RawTextureInfo {
    pub index: usize,
}
