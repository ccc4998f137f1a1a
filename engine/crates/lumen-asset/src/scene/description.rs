use std::path::{Component, Path, PathBuf};

use crate::{
    error::{AssetError, AssetResult},
    scene::types::{
        Accessor, AccessorType, BufferView, ComponentType, ImageRef, Material, Primitive, TextureRef,
    },
    texture_codec::TEXTURE_EXTENSION,
};

/// 解析完成的场景描述
///
/// 所有引用都已经在加载时校验过；accessor 的字节范围在 [`Self::accessor_view`] 中校验。
/// 上传到 GPU 之后通过 [`Self::destroy`] 释放，描述本身不会被 Model 持有。
#[derive(Debug)]
pub struct SceneDescription {
    pub(super) source: PathBuf,
    pub(super) blob: Vec<u8>,

    pub(super) buffer_views: Vec<BufferView>,
    pub(super) accessors: Vec<Accessor>,
    pub(super) primitives: Vec<Primitive>,
    pub(super) images: Vec<ImageRef>,
    pub(super) textures: Vec<TextureRef>,
    pub(super) materials: Vec<Material>,

    pub(super) node_scale: [f32; 3],
}

// getters
impl SceneDescription {
    /// 描述文件的路径
    #[inline]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    #[inline]
    pub fn buffer_views(&self) -> &[BufferView] {
        &self.buffer_views
    }

    #[inline]
    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    #[inline]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    #[inline]
    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    #[inline]
    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    #[inline]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// 唯一 node 的缩放
    #[inline]
    pub fn node_scale(&self) -> [f32; 3] {
        self.node_scale
    }
}

// tools
impl SceneDescription {
    /// 根据 accessor 拿到它在 blob 中的数据
    ///
    /// 这里是 accessor 真正被读取的地方，count 与字节范围是否一致在这里检查
    pub fn accessor_view(&self, index: usize) -> AssetResult<AccessorView<'_>> {
        let accessor = self
            .accessors
            .get(index)
            .ok_or_else(|| self.structural(format!("accessor {index} out of range")))?;
        // buffer view 的引用和范围已经在加载时校验过
        let view = &self.buffer_views[accessor.buffer_view];

        let component_size = accessor.component_type.size().ok_or_else(|| {
            self.structural(format!("accessor {index} has unknown component type"))
        })?;
        let component_count = accessor.element_type.component_count().ok_or_else(|| {
            self.structural(format!("accessor {index} has unknown element type"))
        })?;

        let element_size = component_size * component_count;
        let stride = view.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(self.structural(format!(
                "accessor {index}: byte stride {stride} is smaller than element size {element_size}"
            )));
        }

        let needed = match accessor.count {
            0 => Some(0),
            count => (count - 1).checked_mul(stride).and_then(|n| n.checked_add(element_size)),
        };
        let end = needed.and_then(|n| n.checked_add(accessor.byte_offset));
        match end {
            Some(end) if end <= view.byte_length => (),
            _ => {
                return Err(self.structural(format!(
                    "accessor {index}: {} elements at offset {} do not fit in buffer view of {} bytes",
                    accessor.count, accessor.byte_offset, view.byte_length
                )));
            }
        }

        let begin = view.byte_offset + accessor.byte_offset;
        let data = &self.blob[begin..view.byte_offset + view.byte_length];

        Ok(AccessorView {
            source: &self.source,
            index,
            data,
            stride,
            count: accessor.count,
            component_type: accessor.component_type,
            element_type: accessor.element_type,
        })
    }

    /// 图片对应的压缩纹理路径：与描述文件同目录，扩展名替换为 `.ltex`
    ///
    /// uri 必须是不含 `..` 的相对路径
    pub fn texture_path(&self, image_index: usize) -> AssetResult<PathBuf> {
        let image = self
            .images
            .get(image_index)
            .ok_or_else(|| self.structural(format!("image {image_index} out of range")))?;

        let uri = Path::new(&image.uri);
        let is_plain_relative = uri.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if image.uri.is_empty() || !is_plain_relative || uri.file_stem().is_none() {
            return Err(self.structural(format!("image {image_index} has an invalid uri: {:?}", image.uri)));
        }

        let base_dir = self.source.parent().unwrap_or(Path::new(""));
        Ok(base_dir.join(uri).with_extension(TEXTURE_EXTENSION))
    }

    /// 以当前描述文件为来源的结构错误
    pub fn structural(&self, reason: impl Into<String>) -> AssetError {
        AssetError::structural(&self.source, reason)
    }
}

// destroy
impl SceneDescription {
    /// 释放 blob 以及所有解析出的数组
    pub fn destroy(self) {
        log::debug!("destroy scene description: {}", self.source.display());
        drop(self);
    }
}

/// accessor 在 blob 中的只读视图
#[derive(Debug, Clone, Copy)]
pub struct AccessorView<'a> {
    source: &'a Path,
    index: usize,

    /// 从第一个元素开始，到 buffer view 结束
    data: &'a [u8],
    stride: usize,
    count: usize,

    component_type: ComponentType,
    element_type: AccessorType,
}

// getters
impl<'a> AccessorView<'a> {
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    #[inline]
    pub fn element_type(&self) -> AccessorType {
        self.element_type
    }
}

// 类型检查
impl<'a> AccessorView<'a> {
    /// 要求分量类型为 f32，形状为 `element_type`
    pub fn expect_floats(self, element_type: AccessorType) -> AssetResult<Self> {
        if self.component_type != ComponentType::F32 || self.element_type != element_type {
            return Err(AssetError::structural(
                self.source,
                format!(
                    "accessor {} is {:?}/{:?}, expected F32/{:?}",
                    self.index, self.component_type, self.element_type, element_type
                ),
            ));
        }
        Ok(self)
    }

    /// 要求是无符号整数的 SCALAR，用作 index
    pub fn expect_indices(self) -> AssetResult<Self> {
        let is_index_type = matches!(self.component_type, ComponentType::U8 | ComponentType::U16 | ComponentType::U32);
        if !is_index_type || self.element_type != AccessorType::Scalar {
            return Err(AssetError::structural(
                self.source,
                format!(
                    "accessor {} is {:?}/{:?}, which can not be used as indices",
                    self.index, self.component_type, self.element_type
                ),
            ));
        }
        Ok(self)
    }
}

// 读取，调用前需要经过类型检查
impl<'a> AccessorView<'a> {
    #[inline]
    fn element(&self, i: usize) -> &'a [u8] {
        debug_assert!(i < self.count);
        &self.data[i * self.stride..]
    }

    /// 读取第 i 个元素的前 N 个 f32 分量（小端）
    pub fn read_floats<const N: usize>(&self, i: usize) -> [f32; N] {
        debug_assert_eq!(self.component_type, ComponentType::F32);
        let bytes = self.element(i);
        std::array::from_fn(|k| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[k * 4..k * 4 + 4]);
            f32::from_le_bytes(raw)
        })
    }

    /// 读取第 i 个 index，统一扩展为 u32
    pub fn read_index(&self, i: usize) -> u32 {
        let bytes = self.element(i);
        match self.component_type {
            ComponentType::U8 => u32::from(bytes[0]),
            ComponentType::U16 => u32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            ComponentType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            other => {
                debug_assert!(false, "read_index on {:?}", other);
                0
            }
        }
    }
}
