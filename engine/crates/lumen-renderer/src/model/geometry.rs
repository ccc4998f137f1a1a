use lumen_asset::{
    AssetResult,
    scene::{AccessorType, AccessorView, PrimitiveTopology, SceneDescription},
};

use crate::model::vertex::Vertex;

/// 模型中的一个绘制单元，对应全局 index buffer 中的一段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPrimitive {
    pub first_index: u32,
    pub index_count: u32,
    pub material_index: Option<usize>,
}

/// 所有 primitive 合并之后的 CPU 侧几何数据
#[derive(Debug, Default)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    /// 已经加上了所属 primitive 的起始顶点
    pub indices: Vec<u32>,
    pub primitives: Vec<ModelPrimitive>,
}

/// 将场景中的所有 primitive 合并到一个 vertex 数组和一个 index 数组中
///
/// 每个 index 都会加上所属 primitive 在全局 vertex 数组中的起始位置，
/// 多个 primitive 的 index 因此不会互相冲突
pub fn build_geometry(scene: &SceneDescription) -> AssetResult<Geometry> {
    // 先统计总数，一次分配
    let mut total_vertices = 0usize;
    let mut total_indices = 0usize;
    for primitive in scene.primitives() {
        total_vertices += scene.accessor_view(primitive.attributes.position)?.count();
        total_indices += scene.accessor_view(primitive.indices)?.count();
    }
    if u32::try_from(total_vertices).is_err() || u32::try_from(total_indices).is_err() {
        return Err(scene.structural(format!(
            "{total_vertices} vertices / {total_indices} indices exceed the 32-bit index range"
        )));
    }

    let mut geometry = Geometry {
        vertices: Vec::with_capacity(total_vertices),
        indices: Vec::with_capacity(total_indices),
        primitives: Vec::with_capacity(scene.primitives().len()),
    };

    for (primitive_index, primitive) in scene.primitives().iter().enumerate() {
        if primitive.topology != PrimitiveTopology::Triangles {
            return Err(scene.structural(format!(
                "primitive {primitive_index} uses {:?}, only triangle lists can be drawn",
                primitive.topology
            )));
        }
        if let Some(material) = primitive.material {
            if material >= scene.materials().len() {
                return Err(scene.structural(format!(
                    "primitive {primitive_index} references material {material}, but there are only {}",
                    scene.materials().len()
                )));
            }
        }

        let positions = scene.accessor_view(primitive.attributes.position)?.expect_floats(AccessorType::Vec3)?;
        let vertex_count = positions.count();
        let normals = optional_attribute(scene, primitive.attributes.normal, AccessorType::Vec3, vertex_count)?;
        let uvs = optional_attribute(scene, primitive.attributes.texcoord0, AccessorType::Vec2, vertex_count)?;
        let indices = scene.accessor_view(primitive.indices)?.expect_indices()?;

        // 总数已经检查过不超过 u32
        let vertex_start = geometry.vertices.len() as u32;
        let first_index = geometry.indices.len() as u32;

        geometry.vertices.extend((0..vertex_count).map(|i| Vertex {
            pos: positions.read_floats::<3>(i),
            normal: normals.as_ref().map_or([0.0; 3], |view| view.read_floats::<3>(i)),
            uv: uvs.as_ref().map_or([0.0; 2], |view| view.read_floats::<2>(i)),
        }));

        for i in 0..indices.count() {
            let local = indices.read_index(i);
            if local as usize >= vertex_count {
                return Err(scene.structural(format!(
                    "primitive {primitive_index}: index {local} out of range, it has {vertex_count} vertices"
                )));
            }
            geometry.indices.push(local + vertex_start);
        }

        geometry.primitives.push(ModelPrimitive {
            first_index,
            index_count: indices.count() as u32,
            material_index: primitive.material,
        });
    }

    log::debug!(
        "built geometry of {}: {} vertices, {} indices, {} primitives",
        scene.source().display(),
        geometry.vertices.len(),
        geometry.indices.len(),
        geometry.primitives.len()
    );
    Ok(geometry)
}

/// 可选的顶点属性，存在时数量必须与 position 一致
fn optional_attribute<'a>(
    scene: &'a SceneDescription,
    accessor: Option<usize>,
    element_type: AccessorType,
    vertex_count: usize,
) -> AssetResult<Option<AccessorView<'a>>> {
    let Some(accessor) = accessor else {
        return Ok(None);
    };
    let view = scene.accessor_view(accessor)?.expect_floats(element_type)?;
    if view.count() != vertex_count {
        return Err(scene.structural(format!(
            "accessor {accessor} has {} elements, but the primitive has {vertex_count} vertices",
            view.count()
        )));
    }
    Ok(Some(view))
}

#[cfg(test)]
pub(crate) mod tests {
    use lumen_asset::AssetErrorKind;
    use serde_json::json;

    use super::*;

    /// 两个 primitive，各 4 个顶点 6 个 index，第二个带 normal 和 uv；blob 布局：
    /// [pos0 48][pos1 48][normal1 48][uv1 32][idx0 12][idx1 12]
    pub(crate) fn two_quads_doc() -> serde_json::Value {
        json!({
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 176 },
                { "buffer": 0, "byteOffset": 176, "byteLength": 24 }
            ],
            "accessors": [
                { "bufferView": 0, "byteOffset": 0, "count": 4, "componentType": 5126, "type": "VEC3" },
                { "bufferView": 0, "byteOffset": 48, "count": 4, "componentType": 5126, "type": "VEC3" },
                { "bufferView": 0, "byteOffset": 96, "count": 4, "componentType": 5126, "type": "VEC3" },
                { "bufferView": 0, "byteOffset": 144, "count": 4, "componentType": 5126, "type": "VEC2" },
                { "bufferView": 1, "byteOffset": 0, "count": 6, "componentType": 5123, "type": "SCALAR" },
                { "bufferView": 1, "byteOffset": 12, "count": 6, "componentType": 5123, "type": "SCALAR" }
            ],
            "nodes": [ { "mesh": 0, "scale": [2.0, 2.0, 2.0] } ],
            "meshes": [ { "primitives": [
                { "attributes": { "POSITION": 0 }, "indices": 4, "material": 0 },
                { "attributes": { "POSITION": 1, "NORMAL": 2, "TEXCOORD_0": 3 }, "indices": 5, "material": 1 }
            ] } ],
            "images": [ { "uri": "albedo.png", "mimeType": "image/png" } ],
            "textures": [ { "source": 0 } ],
            "materials": [
                { "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } },
                { "alphaMode": "BLEND", "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }
            ]
        })
    }

    pub(crate) fn two_quads_blob() -> Vec<u8> {
        let mut blob = Vec::new();
        let mut push = |values: &[f32]| values.iter().for_each(|v| blob.extend_from_slice(&v.to_le_bytes()));
        for quad in 0..2 {
            for v in 0..4 {
                push(&[v as f32, quad as f32, 0.0]);
            }
        }
        for _ in 0..4 {
            push(&[0.0, 0.0, 1.0]);
        }
        for v in 0..4 {
            push(&[v as f32 * 0.25, 0.5]);
        }
        for _ in 0..2 {
            for i in [0u16, 1, 2, 2, 3, 0] {
                blob.extend_from_slice(&i.to_le_bytes());
            }
        }
        blob
    }

    pub(crate) fn parse(doc: &serde_json::Value, source: &std::path::Path) -> AssetResult<SceneDescription> {
        SceneDescription::parse(source, doc.to_string().as_bytes(), two_quads_blob())
    }

    fn build(doc: &serde_json::Value) -> AssetResult<Geometry> {
        build_geometry(&parse(doc, std::path::Path::new("assets/quads.json"))?)
    }

    #[test]
    fn second_primitive_indices_are_offset() {
        let geometry = build(&two_quads_doc()).unwrap();

        assert_eq!(geometry.vertices.len(), 8);
        assert_eq!(geometry.indices, [0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert!(geometry.indices.iter().all(|&i| i <= 7));
        assert_eq!(
            geometry.primitives,
            [
                ModelPrimitive {
                    first_index: 0,
                    index_count: 6,
                    material_index: Some(0)
                },
                ModelPrimitive {
                    first_index: 6,
                    index_count: 6,
                    material_index: Some(1)
                },
            ]
        );
    }

    #[test]
    fn global_index_is_local_plus_first_vertex_count() {
        let geometry = build(&two_quads_doc()).unwrap();
        let v0 = 4;
        let second = geometry.primitives[1];
        let local = [0u32, 1, 2, 2, 3, 0];
        let global = &geometry.indices[second.first_index as usize..][..second.index_count as usize];
        for (j, g) in local.iter().zip(global) {
            assert_eq!(*g, j + v0);
        }
    }

    #[test]
    fn attributes_are_interleaved() {
        let geometry = build(&two_quads_doc()).unwrap();

        // 第一个 primitive 没有 normal 和 uv
        assert_eq!(geometry.vertices[1].pos, [1.0, 0.0, 0.0]);
        assert_eq!(geometry.vertices[1].normal, [0.0; 3]);
        assert_eq!(geometry.vertices[1].uv, [0.0; 2]);

        assert_eq!(geometry.vertices[6].pos, [2.0, 1.0, 0.0]);
        assert_eq!(geometry.vertices[6].normal, [0.0, 0.0, 1.0]);
        assert_eq!(geometry.vertices[6].uv, [0.5, 0.5]);
    }

    #[test]
    fn index_past_primitive_vertices_is_structural() {
        let mut doc = two_quads_doc();
        // 第二个 primitive 改用第一个 primitive 的 6 个 index，再让它只有 2 个顶点
        doc["accessors"][1]["count"] = json!(2);
        let err = build(&doc).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn non_triangle_topology_is_structural() {
        let mut doc = two_quads_doc();
        doc["meshes"][0]["primitives"][0]["mode"] = json!(5);
        let err = build(&doc).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn mismatched_normal_count_is_structural() {
        let mut doc = two_quads_doc();
        doc["accessors"][2]["count"] = json!(3);
        let err = build(&doc).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::StructuralParse);
    }

    #[test]
    fn float_indices_are_rejected() {
        let mut doc = two_quads_doc();
        doc["meshes"][0]["primitives"][0]["indices"] = json!(0);
        let err = build(&doc).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::StructuralParse);
    }
}
