use glam::{Mat4, Vec3};
use tracing::warn;

use crate::{
    content::{LoadError, MaterialData, MeshData, ModelData, ModelPrimitive},
    renderer::shaders::Vertex,
};

/// Parse a binary glTF (`.glb`) file into model data.
///
/// Every triangle primitive reachable from the default scene becomes one
/// `ModelPrimitive`, with the node hierarchy flattened into a transform
/// relative to the model root. Buffers must live in the GLB binary chunk.
pub fn parse_glb(bytes: &[u8], locator: &str) -> Result<ModelData, LoadError> {
    let malformed = |reason: String| LoadError::Malformed {
        locator: locator.to_string(),
        reason,
    };

    let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
    let blob = gltf.blob.as_deref();

    // Resolve every buffer up front so a missing one is reported as an error
    // rather than silently dropping geometry.
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin if blob.is_some() => {}
            gltf::buffer::Source::Bin => {
                return Err(malformed("missing GLB binary chunk".to_string()))
            }
            gltf::buffer::Source::Uri(uri) => {
                return Err(malformed(format!("external buffer {uri:?} is not supported")))
            }
        }
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| malformed("file contains no scenes".to_string()))?;

    let mut primitives = Vec::new();

    for node in scene.nodes() {
        collect_node(&node, Mat4::IDENTITY, blob, &mut primitives).map_err(malformed)?;
    }

    if primitives.is_empty() {
        return Err(malformed("no triangle primitives found".to_string()));
    }

    Ok(ModelData {
        name: scene
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| locator.to_string()),
        primitives,
    })
}

/// Walk `node` and its children, appending any triangle primitives. Errors are
/// the reason the file is malformed.
fn collect_node(
    node: &gltf::Node,
    parent_transform: Mat4,
    blob: Option<&[u8]>,
    primitives: &mut Vec<ModelPrimitive>,
) -> Result<(), String> {
    let transform = parent_transform * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh
            .name()
            .or(node.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh {}", mesh.index()));

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                warn!(
                    "skipping {:?} primitive {} of {mesh_name}, only triangles are drawn",
                    primitive.mode(),
                    primitive.index()
                );
                continue;
            }

            let label = format!("{mesh_name} #{}", primitive.index());

            match read_primitive(&primitive, blob, &label)? {
                Some(mesh) => primitives.push(ModelPrimitive {
                    mesh,
                    material: read_material(&primitive.material(), &label),
                    local_transform: transform,
                }),
                None => warn!("skipping primitive {label} without positions"),
            }
        }
    }

    for child in node.children() {
        collect_node(&child, transform, blob, primitives)?;
    }

    Ok(())
}

fn read_primitive(
    primitive: &gltf::Primitive,
    blob: Option<&[u8]>,
    label: &str,
) -> Result<Option<MeshData>, String> {
    // The gltf readers underflow on empty accessors.
    for (semantic, accessor) in primitive.attributes() {
        if accessor.count() == 0 {
            return Err(format!("{label} has an empty {semantic:?} accessor"));
        }
    }

    if primitive.indices().is_some_and(|a| a.count() == 0) {
        return Err(format!("{label} has an empty index accessor"));
    }

    let reader = primitive.reader(|_| blob);

    let Some(positions) = reader.read_positions() else {
        return Ok(None);
    };
    let positions: Vec<[f32; 3]> = positions.collect();

    let mut normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    normals.resize(positions.len(), [0.0, 0.0, 0.0]);

    let mut tex_coords: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|iter| iter.into_f32().collect())
        .unwrap_or_default();
    tex_coords.resize(positions.len(), [0.0, 0.0]);

    let indices: Vec<u32> = match reader.read_indices() {
        Some(iter) => iter.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(format!(
            "{label} index {bad} is out of range for {} vertices",
            positions.len()
        ));
    }

    let vertices = positions
        .iter()
        .zip(normals.iter())
        .zip(tex_coords.iter())
        .map(|((position, normal), tex_coords)| Vertex {
            position: *position,
            normal: *normal,
            tex_coords: *tex_coords,
        })
        .collect();

    Ok(Some(MeshData {
        label: label.to_string(),
        vertices,
        indices,
    }))
}

fn read_material(material: &gltf::Material, label: &str) -> MaterialData {
    // glTF base colors are already linear.
    let [r, g, b, _a] = material.pbr_metallic_roughness().base_color_factor();

    MaterialData::with_color(
        material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{label} material")),
        Vec3::new(r, g, b),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// JSON and binary chunks of a GLB holding a single triangle, optionally
    /// nested under a translated parent node.
    fn triangle_chunks(parent_offset: Option<[f32; 3]>) -> (String, Vec<u8>) {
        let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let indices: [u16; 3] = [0, 1, 2];

        let mut bin: Vec<u8> = bytemuck::cast_slice(&positions).to_vec();
        bin.extend_from_slice(bytemuck::cast_slice(&indices));
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let (scene_nodes, nodes) = match parent_offset {
            Some([x, y, z]) => (
                "[1]".to_string(),
                format!(
                    r#"[{{"name":"tri","mesh":0}},{{"name":"root","children":[0],"translation":[{x},{y},{z}]}}]"#
                ),
            ),
            None => ("[0]".to_string(), r#"[{"name":"tri","mesh":0}]"#.to_string()),
        };

        let json = format!(
            r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"name":"test","nodes":{scene_nodes}}}],"nodes":{nodes},"meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}},"indices":1,"material":0}}]}}],"materials":[{{"name":"red","pbrMetallicRoughness":{{"baseColorFactor":[1.0,0.0,0.0,1.0]}}}}],"buffers":[{{"byteLength":{len}}}],"bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}},{{"buffer":0,"byteOffset":36,"byteLength":6}}],"accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0.0,0.0,0.0],"max":[1.0,1.0,0.0]}},{{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}}]}}"#,
            len = bin.len()
        );

        (json, bin)
    }

    /// Pack JSON and binary chunks into a GLB container.
    fn build_glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total_len = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total_len);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total_len as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(bin);
        glb
    }

    pub(crate) fn triangle_glb(parent_offset: Option<[f32; 3]>) -> Vec<u8> {
        let (json, bin) = triangle_chunks(parent_offset);
        build_glb(&json, &bin)
    }

    /// A triangle GLB whose POSITION accessor claims to hold no elements.
    pub(crate) fn empty_positions_glb() -> Vec<u8> {
        let (json, bin) = triangle_chunks(None);
        let json = json.replace(
            r#""count":3,"type":"VEC3""#,
            r#""count":0,"type":"VEC3""#,
        );
        build_glb(&json, &bin)
    }

    #[test]
    fn parses_single_triangle() {
        let model = parse_glb(&triangle_glb(None), "tri.glb").unwrap();

        assert_eq!("test", model.name);
        assert_eq!(1, model.primitives.len());

        let primitive = &model.primitives[0];
        assert_eq!(vec![0, 1, 2], primitive.mesh.indices);
        assert_eq!(3, primitive.mesh.vertices.len());
        assert_eq!([1.0, 0.0, 0.0], primitive.mesh.vertices[1].position);
        assert_eq!([0.0, 0.0, 0.0], primitive.mesh.vertices[1].normal);
        assert_eq!("red", primitive.material.label);
        assert_eq!(Vec3::new(1.0, 0.0, 0.0), primitive.material.diffuse_color);
        assert_eq!(Mat4::IDENTITY, primitive.local_transform);
    }

    #[test]
    fn flattens_parent_transforms() {
        let model = parse_glb(&triangle_glb(Some([0.0, 2.0, 0.0])), "tri.glb").unwrap();

        assert_eq!(
            Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
            model.primitives[0].local_transform
        );
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let result = parse_glb(b"definitely not a model", "junk.glb");
        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn truncated_glb_is_malformed() {
        let glb = triangle_glb(None);
        let result = parse_glb(&glb[..glb.len() / 2], "half.glb");
        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn empty_position_accessor_is_malformed() {
        let result = parse_glb(&empty_positions_glb(), "empty.glb");
        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn empty_index_accessor_is_malformed() {
        let (json, bin) = triangle_chunks(None);
        let json = json.replace(
            r#""count":3,"type":"SCALAR""#,
            r#""count":0,"type":"SCALAR""#,
        );

        let result = parse_glb(&build_glb(&json, &bin), "empty.glb");
        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn out_of_range_index_is_malformed() {
        let (json, mut bin) = triangle_chunks(None);
        // Second index, after three VEC3 positions.
        bin[38..40].copy_from_slice(&7u16.to_le_bytes());

        let result = parse_glb(&build_glb(&json, &bin), "bad_index.glb");
        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }
}
