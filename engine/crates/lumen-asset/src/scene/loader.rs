use std::path::Path;

use itertools::Itertools;
use serde_json::error::Category;

use crate::{
    error::{AssetError, AssetResult},
    scene::{
        BLOB_EXTENSION,
        description::SceneDescription,
        raw::RawDocument,
        types::{
            Accessor, AccessorType, AlphaMode, BufferView, ComponentType, ImageRef, Material, MimeType, Primitive,
            PrimitiveAttributes, PrimitiveTopology, TextureRef,
        },
    },
};

// load
impl SceneDescription {
    /// 读取描述文件以及同名的 `.bin` blob
    pub fn load(description_path: impl AsRef<Path>) -> AssetResult<Self> {
        let description_path = description_path.as_ref();
        if description_path.file_stem().is_none() {
            return Err(AssetError::structural(description_path, "description path has no file name"));
        }
        let blob_path = description_path.with_extension(BLOB_EXTENSION);

        let blob = std::fs::read(&blob_path).map_err(|e| AssetError::not_found(&blob_path, e))?;
        let description =
            std::fs::read(description_path).map_err(|e| AssetError::not_found(description_path, e))?;

        let scene = Self::parse(description_path, &description, blob)?;
        log::info!(
            "load scene {}: {} primitives, {} materials, {} textures, {} images, blob {} bytes",
            description_path.display(),
            scene.primitives.len(),
            scene.materials.len(),
            scene.textures.len(),
            scene.images.len(),
            scene.blob.len()
        );
        Ok(scene)
    }

    /// 从内存中的描述文本和 blob 构建场景
    ///
    /// `source` 是描述文件的路径，用于定位纹理以及错误信息
    pub fn parse(source: impl AsRef<Path>, description: &[u8], blob: Vec<u8>) -> AssetResult<Self> {
        let source = source.as_ref();
        let doc: RawDocument = serde_json::from_slice(description).map_err(|e| match e.classify() {
            // 缺少字段或者类型不对
            Category::Data => AssetError::structural(source, e.to_string()),
            Category::Syntax | Category::Eof | Category::Io => AssetError::corrupt(source, e.to_string()),
        })?;

        if doc.meshes.len() != 1 {
            return Err(AssetError::structural(
                source,
                format!("exactly one mesh is supported, found {}", doc.meshes.len()),
            ));
        }
        if doc.nodes.len() != 1 {
            return Err(AssetError::structural(
                source,
                format!("exactly one node is supported, found {}", doc.nodes.len()),
            ));
        }

        let scene = Self {
            source: source.to_path_buf(),
            node_scale: doc.nodes[0].scale.unwrap_or([1.0; 3]),

            buffer_views: doc
                .buffer_views
                .iter()
                .map(|v| BufferView {
                    buffer: v.buffer,
                    byte_offset: v.byte_offset,
                    byte_length: v.byte_length,
                    byte_stride: v.byte_stride,
                })
                .collect_vec(),
            accessors: doc
                .accessors
                .iter()
                .map(|a| Accessor {
                    buffer_view: a.buffer_view,
                    byte_offset: a.byte_offset,
                    count: a.count,
                    component_type: ComponentType::from(a.component_type),
                    element_type: AccessorType::from(a.element_type.as_str()),
                })
                .collect_vec(),
            primitives: doc.meshes[0]
                .primitives
                .iter()
                .map(|p| Primitive {
                    attributes: PrimitiveAttributes {
                        position: p.attributes.position,
                        normal: p.attributes.normal,
                        texcoord0: p.attributes.texcoord0,
                    },
                    indices: p.indices,
                    material: p.material,
                    topology: PrimitiveTopology::from(p.mode),
                })
                .collect_vec(),
            images: doc
                .images
                .iter()
                .map(|i| ImageRef {
                    uri: i.uri.clone(),
                    mime_type: MimeType::from(i.mime_type.as_deref()),
                })
                .collect_vec(),
            textures: doc.textures.iter().map(|t| TextureRef { image: t.source }).collect_vec(),
            materials: doc
                .materials
                .iter()
                .map(|m| Material {
                    alpha_mode: AlphaMode::from(m.alpha_mode.as_deref()),
                    base_color_texture: m.pbr_metallic_roughness.base_color_texture.index,
                })
                .collect_vec(),

            blob,
        };

        scene.validate()?;
        Ok(scene)
    }
}

// 校验
impl SceneDescription {
    /// 所有引用必须落在目标数组内，buffer view 必须落在 blob 内
    fn validate(&self) -> AssetResult<()> {
        let check = |what: &str, owner: usize, index: usize, len: usize| {
            if index < len {
                Ok(())
            } else {
                Err(self.structural(format!("{what} of #{owner} is {index}, but only {len} exist")))
            }
        };

        for (i, view) in self.buffer_views.iter().enumerate() {
            if view.buffer != 0 {
                return Err(self.structural(format!(
                    "buffer view {i} references buffer {}, only the scene blob (0) exists",
                    view.buffer
                )));
            }
            let end = view.byte_offset.checked_add(view.byte_length);
            if end.is_none_or(|end| end > self.blob.len()) {
                return Err(AssetError::corrupt(
                    self.source.with_extension(BLOB_EXTENSION),
                    format!(
                        "buffer view {i} [{}, +{}) exceeds blob of {} bytes",
                        view.byte_offset,
                        view.byte_length,
                        self.blob.len()
                    ),
                ));
            }
        }

        for (i, accessor) in self.accessors.iter().enumerate() {
            check("accessor buffer view", i, accessor.buffer_view, self.buffer_views.len())?;
        }

        let accessor_count = self.accessors.len();
        for (i, primitive) in self.primitives.iter().enumerate() {
            check("primitive POSITION", i, primitive.attributes.position, accessor_count)?;
            if let Some(normal) = primitive.attributes.normal {
                check("primitive NORMAL", i, normal, accessor_count)?;
            }
            if let Some(uv) = primitive.attributes.texcoord0 {
                check("primitive TEXCOORD_0", i, uv, accessor_count)?;
            }
            check("primitive indices", i, primitive.indices, accessor_count)?;
            if let Some(material) = primitive.material {
                check("primitive material", i, material, self.materials.len())?;
            }
        }

        for (i, texture) in self.textures.iter().enumerate() {
            check("texture image", i, texture.image, self.images.len())?;
        }
        for (i, material) in self.materials.iter().enumerate() {
            check("material base color texture", i, material.base_color_texture, self.textures.len())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetErrorKind;
    use serde_json::json;

    /// 两个 primitive，各 4 个顶点 6 个 index；blob 布局：
    /// [pos0 48][pos1 48][idx0 12][idx1 12]
    fn two_quads_doc() -> serde_json::Value {
        json!({
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 96 },
                { "buffer": 0, "byteOffset": 96, "byteLength": 24 }
            ],
            "accessors": [
                { "bufferView": 0, "byteOffset": 0, "count": 4, "componentType": 5126, "type": "VEC3" },
                { "bufferView": 0, "byteOffset": 48, "count": 4, "componentType": 5126, "type": "VEC3" },
                { "bufferView": 1, "byteOffset": 0, "count": 6, "componentType": 5123, "type": "SCALAR" },
                { "bufferView": 1, "byteOffset": 12, "count": 6, "componentType": 5123, "type": "SCALAR" }
            ],
            "nodes": [ { "mesh": 0, "scale": [2.0, 2.0, 2.0] } ],
            "meshes": [ { "primitives": [
                { "attributes": { "POSITION": 0 }, "indices": 2, "material": 0 },
                { "attributes": { "POSITION": 1 }, "indices": 3, "material": 1 }
            ] } ],
            "images": [ { "uri": "albedo.png", "mimeType": "image/png" } ],
            "textures": [ { "source": 0 } ],
            "materials": [
                { "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } },
                { "alphaMode": "BLEND", "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }
            ]
        })
    }

    fn two_quads_blob() -> Vec<u8> {
        let mut blob = Vec::new();
        for quad in 0..2 {
            for v in 0..4 {
                for c in [v as f32, quad as f32, 0.0f32] {
                    blob.extend_from_slice(&c.to_le_bytes());
                }
            }
        }
        for _ in 0..2 {
            for i in [0u16, 1, 2, 2, 3, 0] {
                blob.extend_from_slice(&i.to_le_bytes());
            }
        }
        blob
    }

    fn parse(doc: &serde_json::Value) -> AssetResult<SceneDescription> {
        SceneDescription::parse("assets/quads.json", doc.to_string().as_bytes(), two_quads_blob())
    }

    #[test]
    fn arrays_keep_file_order() {
        let scene = parse(&two_quads_doc()).unwrap();

        assert_eq!(scene.primitives().len(), 2);
        assert_eq!(scene.primitives()[0].indices, 2);
        assert_eq!(scene.primitives()[1].indices, 3);
        assert_eq!(scene.primitives()[1].material, Some(1));
        assert_eq!(scene.accessors()[1].byte_offset, 48);
        assert_eq!(scene.materials()[0].alpha_mode, AlphaMode::Opaque);
        assert_eq!(scene.materials()[1].alpha_mode, AlphaMode::Blend);
        assert_eq!(scene.images()[0].mime_type, MimeType::Png);
        assert_eq!(scene.node_scale(), [2.0; 3]);
        assert_eq!(scene.blob().len(), 120);
    }

    #[test]
    fn accessor_view_reads_blob() {
        let scene = parse(&two_quads_doc()).unwrap();

        let positions = scene.accessor_view(1).unwrap().expect_floats(AccessorType::Vec3).unwrap();
        assert_eq!(positions.count(), 4);
        assert_eq!(positions.read_floats::<3>(2), [2.0, 1.0, 0.0]);

        let indices = scene.accessor_view(3).unwrap().expect_indices().unwrap();
        let values = (0..indices.count()).map(|i| indices.read_index(i)).collect_vec();
        assert_eq!(values, vec![0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn material_out_of_range_is_structural() {
        let mut doc = two_quads_doc();
        doc["meshes"][0]["primitives"][1]["material"] = json!(2);
        assert_eq!(parse(&doc).unwrap_err().kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn texture_out_of_range_is_structural() {
        let mut doc = two_quads_doc();
        doc["materials"][1]["pbrMetallicRoughness"]["baseColorTexture"]["index"] = json!(1);
        assert_eq!(parse(&doc).unwrap_err().kind(), AssetErrorKind::StructuralParse);

        let mut doc = two_quads_doc();
        doc["textures"][0]["source"] = json!(5);
        assert_eq!(parse(&doc).unwrap_err().kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn empty_materials_with_material_reference_is_structural() {
        let mut doc = two_quads_doc();
        doc["materials"] = json!([]);
        assert_eq!(parse(&doc).unwrap_err().kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn empty_materials_without_references_loads() {
        let mut doc = two_quads_doc();
        doc["materials"] = json!([]);
        for p in doc["meshes"][0]["primitives"].as_array_mut().unwrap() {
            p.as_object_mut().unwrap().remove("material");
        }
        let scene = parse(&doc).unwrap();
        assert!(scene.materials().is_empty());
        assert!(scene.primitives().iter().all(|p| p.material.is_none()));
    }

    #[test]
    fn missing_required_key_is_structural() {
        let mut doc = two_quads_doc();
        doc.as_object_mut().unwrap().remove("accessors");
        assert_eq!(parse(&doc).unwrap_err().kind(), AssetErrorKind::StructuralParse);

        let mut doc = two_quads_doc();
        doc["materials"][0].as_object_mut().unwrap().remove("pbrMetallicRoughness");
        assert_eq!(parse(&doc).unwrap_err().kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn broken_json_is_corrupt() {
        let err = SceneDescription::parse("x.json", br#"{ "bufferViews": [ "#, vec![]).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::Corrupt);
    }

    #[test]
    fn multiple_meshes_or_nodes_are_structural() {
        let mut doc = two_quads_doc();
        let mesh = doc["meshes"][0].clone();
        doc["meshes"].as_array_mut().unwrap().push(mesh);
        assert_eq!(parse(&doc).unwrap_err().kind(), AssetErrorKind::StructuralParse);

        let mut doc = two_quads_doc();
        doc["nodes"].as_array_mut().unwrap().push(json!({}));
        assert_eq!(parse(&doc).unwrap_err().kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn buffer_view_past_blob_is_corrupt() {
        let mut doc = two_quads_doc();
        doc["bufferViews"][1]["byteLength"] = json!(64);
        assert_eq!(parse(&doc).unwrap_err().kind(), AssetErrorKind::Corrupt);
    }

    #[test]
    fn unknown_enums_fail_only_when_read() {
        let mut doc = two_quads_doc();
        doc["accessors"][0]["componentType"] = json!(9999);
        doc["images"][0]["mimeType"] = json!("image/ktx2");
        let scene = parse(&doc).unwrap();
        assert_eq!(scene.accessors()[0].component_type, ComponentType::Unknown);
        assert_eq!(scene.images()[0].mime_type, MimeType::Unknown);

        let err = scene.accessor_view(0).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn accessor_count_past_view_is_structural() {
        let mut doc = two_quads_doc();
        doc["accessors"][3]["count"] = json!(7);
        let scene = parse(&doc).unwrap();
        assert_eq!(scene.accessor_view(3).unwrap_err().kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn texture_path_is_sibling_ltex() {
        let scene = parse(&two_quads_doc()).unwrap();
        assert_eq!(scene.texture_path(0).unwrap(), Path::new("assets/albedo.ltex"));

        let mut doc = two_quads_doc();
        doc["images"][0]["uri"] = json!("../outside.png");
        let scene = parse(&doc).unwrap();
        assert_eq!(scene.texture_path(0).unwrap_err().kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn load_reads_sibling_blob() {
        let dir = tempfile::tempdir().unwrap();
        let description = dir.path().join("quads.json");
        std::fs::write(&description, two_quads_doc().to_string()).unwrap();

        // 没有 blob
        let err = SceneDescription::load(&description).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::NotFound);
        assert_eq!(err.path(), dir.path().join("quads.bin"));

        std::fs::write(dir.path().join("quads.bin"), two_quads_blob()).unwrap();
        let scene = SceneDescription::load(&description).unwrap();
        assert_eq!(scene.source(), description);
        scene.destroy();
    }

    #[test]
    fn missing_description_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quads.bin"), two_quads_blob()).unwrap();
        let err = SceneDescription::load(dir.path().join("quads.json")).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::NotFound);
    }
}
