/// 图片的 mime 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    Png,
    Jpeg,
    Unknown,
}
impl From<Option<&str>> for MimeType {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some("image/png") => Self::Png,
            Some("image/jpeg") => Self::Jpeg,
            _ => Self::Unknown,
        }
    }
}

/// 材质的 alpha 模式，缺省为 [`AlphaMode::Opaque`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
    Unknown,
}
impl From<Option<&str>> for AlphaMode {
    fn from(value: Option<&str>) -> Self {
        match value {
            None | Some("OPAQUE") => Self::Opaque,
            Some("MASK") => Self::Mask,
            Some("BLEND") => Self::Blend,
            Some(_) => Self::Unknown,
        }
    }
}

/// accessor 中每个元素的形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Unknown,
}
impl From<&str> for AccessorType {
    fn from(value: &str) -> Self {
        match value {
            "SCALAR" => Self::Scalar,
            "VEC2" => Self::Vec2,
            "VEC3" => Self::Vec3,
            "VEC4" => Self::Vec4,
            "MAT2" => Self::Mat2,
            "MAT3" => Self::Mat3,
            "MAT4" => Self::Mat4,
            _ => Self::Unknown,
        }
    }
}
impl AccessorType {
    /// 每个元素包含的分量个数，Unknown 返回 None
    pub fn component_count(self) -> Option<usize> {
        match self {
            Self::Scalar => Some(1),
            Self::Vec2 => Some(2),
            Self::Vec3 => Some(3),
            Self::Vec4 | Self::Mat2 => Some(4),
            Self::Mat3 => Some(9),
            Self::Mat4 => Some(16),
            Self::Unknown => None,
        }
    }
}

/// accessor 中每个分量的类型，数值沿用 GL 的枚举值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
    Unknown,
}
impl From<u32> for ComponentType {
    fn from(value: u32) -> Self {
        match value {
            5120 => Self::I8,
            5121 => Self::U8,
            5122 => Self::I16,
            5123 => Self::U16,
            5125 => Self::U32,
            5126 => Self::F32,
            _ => Self::Unknown,
        }
    }
}
impl ComponentType {
    /// 单个分量的字节数，Unknown 返回 None
    pub fn size(self) -> Option<usize> {
        match self {
            Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::U32 | Self::F32 => Some(4),
            Self::Unknown => None,
        }
    }
}

/// primitive 的拓扑，缺省为 [`PrimitiveTopology::Triangles`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
    Unknown,
}
impl From<Option<u32>> for PrimitiveTopology {
    fn from(value: Option<u32>) -> Self {
        match value {
            Some(0) => Self::Points,
            Some(1) => Self::Lines,
            Some(2) => Self::LineLoop,
            Some(3) => Self::LineStrip,
            None | Some(4) => Self::Triangles,
            Some(5) => Self::TriangleStrip,
            Some(6) => Self::TriangleFan,
            Some(_) => Self::Unknown,
        }
    }
}

/// blob 中的一段字节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// 为 None 时元素紧密排列
    pub byte_stride: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accessor {
    pub buffer_view: usize,
    pub byte_offset: usize,
    pub count: usize,
    pub component_type: ComponentType,
    pub element_type: AccessorType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveAttributes {
    pub position: usize,
    pub normal: Option<usize>,
    pub texcoord0: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    pub attributes: PrimitiveAttributes,
    pub indices: usize,
    pub material: Option<usize>,
    pub topology: PrimitiveTopology,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub uri: String,
    pub mime_type: MimeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRef {
    pub image: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Material {
    pub alpha_mode: AlphaMode,
    pub base_color_texture: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_enumerants_are_tolerated() {
        assert_eq!(MimeType::from(Some("image/webp")), MimeType::Unknown);
        assert_eq!(MimeType::from(None), MimeType::Unknown);
        assert_eq!(AlphaMode::from(Some("HOLOGRAM")), AlphaMode::Unknown);
        assert_eq!(AccessorType::from("VEC5"), AccessorType::Unknown);
        assert_eq!(ComponentType::from(5124), ComponentType::Unknown);
        assert_eq!(PrimitiveTopology::from(Some(9)), PrimitiveTopology::Unknown);
    }

    #[test]
    fn defaults_follow_document_rules() {
        assert_eq!(AlphaMode::from(None), AlphaMode::Opaque);
        assert_eq!(PrimitiveTopology::from(None), PrimitiveTopology::Triangles);
    }

    #[test]
    fn sizes() {
        assert_eq!(ComponentType::U16.size(), Some(2));
        assert_eq!(ComponentType::Unknown.size(), None);
        assert_eq!(AccessorType::Vec3.component_count(), Some(3));
        assert_eq!(AccessorType::Unknown.component_count(), None);
    }
}
