use std::path::Path;

use glam::{Mat4, Vec3};

use crate::{
    content::{LoadError, MaterialData, MeshData, ModelData, ModelPrimitive},
    math_utils::srgb_to_linear,
    platform::{load_as_string, AssetBase},
    renderer::shaders::Vertex,
};

/// Loads a Wavefront obj model, along with any .mtl files it references.
///
/// Material libraries are resolved relative to the directory holding the .obj
/// file. Each obj "model" becomes one primitive.
#[tracing::instrument(level = "info", skip(base))]
pub async fn load_obj_model(base: &AssetBase, obj_locator: &str) -> Result<ModelData, LoadError> {
    let obj_text = load_as_string(base, obj_locator).await?;
    parse_obj(base, obj_locator, &obj_text).await
}

/// Parse obj text that was already fetched from `obj_locator`.
pub async fn parse_obj(
    base: &AssetBase,
    obj_locator: &str,
    obj_text: &str,
) -> Result<ModelData, LoadError> {
    let malformed = |reason: String| LoadError::Malformed {
        locator: obj_locator.to_string(),
        reason,
    };

    let obj_dir = Path::new(obj_locator)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut obj_buf_reader = std::io::BufReader::new(std::io::Cursor::new(obj_text));

    // Parse the .obj file to get a list of models (actually meshes) and material
    // definitions.
    let (obj_models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_buf_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |mtl_file_path| {
            let base = base.clone();
            let mtl_locator = obj_dir.join(mtl_file_path).to_string_lossy().into_owned();

            async move {
                let mtl_text = load_as_string(&base, &mtl_locator)
                    .await
                    .map_err(|e| {
                        tracing::warn!("failed to load material library: {e}");
                        tobj::LoadError::OpenFileFailed
                    })?;

                tobj::load_mtl_buf(&mut std::io::BufReader::new(std::io::Cursor::new(mtl_text)))
            }
        },
    )
    .await
    .map_err(|e| malformed(e.to_string()))?;

    let obj_materials = obj_materials.map_err(|e| malformed(e.to_string()))?;
    let materials: Vec<MaterialData> = obj_materials.iter().map(create_material).collect();

    let primitives: Vec<ModelPrimitive> = obj_models
        .iter()
        .filter(|m| !m.mesh.positions.is_empty())
        .map(|m| ModelPrimitive {
            mesh: create_mesh(m),
            material: m
                .mesh
                .material_id
                .and_then(|id| materials.get(id).cloned())
                .unwrap_or_else(|| {
                    MaterialData::with_color(format!("{} default material", m.name), Vec3::ONE)
                }),
            local_transform: Mat4::IDENTITY,
        })
        .collect();

    if primitives.is_empty() {
        return Err(malformed("obj file has no geometry".to_string()));
    }

    Ok(ModelData {
        name: obj_locator.to_string(),
        primitives,
    })
}

/// Converts an obj .mtl material into phong material properties. Mtl colors are
/// sRGB encoded.
fn create_material(mat: &tobj::Material) -> MaterialData {
    let linear = |c: [f32; 3]| Vec3::from_array(c.map(srgb_to_linear));

    MaterialData {
        label: mat.name.clone(),
        diffuse_color: mat.diffuse.map(linear).unwrap_or(Vec3::ONE),
        specular_color: mat
            .specular
            .map(linear)
            .unwrap_or(MaterialData::DEFAULT_SPECULAR_COLOR),
        shininess: mat.shininess.unwrap_or(MaterialData::DEFAULT_SHININESS),
    }
}

/// Assemble a vertex buffer from tobj's mesh data. By forcing `single_index`
/// the mesh's position, texture and normal buffers have each vertex stored at
/// the same offset (eg position[0] = texture[0] = normal[0]).
///
/// Obj files may omit normals or texture coordinates entirely, in which case
/// zeros are used.
fn create_mesh(model: &tobj::Model) -> MeshData {
    let mesh = &model.mesh;
    let has_normals = mesh.normals.len() == mesh.positions.len();
    let has_tex_coords = mesh.texcoords.len() / 2 == mesh.positions.len() / 3;

    let vertices = (0..mesh.positions.len() / 3)
        .map(|i| Vertex {
            position: [
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            ],
            normal: if has_normals {
                [
                    mesh.normals[i * 3],
                    mesh.normals[i * 3 + 1],
                    mesh.normals[i * 3 + 2],
                ]
            } else {
                [0.0, 0.0, 0.0]
            },
            tex_coords: if has_tex_coords {
                [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            },
        })
        .collect();

    MeshData {
        label: model.name.clone(),
        vertices,
        indices: mesh.indices.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_GEOMETRY: &str = "\
v -1.0 0.0 -1.0
v 1.0 0.0 -1.0
v 1.0 0.0 1.0
v -1.0 0.0 1.0
vn 0.0 1.0 0.0
f 1//1 2//1 3//1 4//1
";

    fn no_assets() -> AssetBase {
        AssetBase::new(std::env::temp_dir().join("underwater-obj-tests-missing"))
    }

    #[test]
    fn quad_is_triangulated() {
        let obj = format!("o quad\n{QUAD_GEOMETRY}");
        let model = pollster::block_on(parse_obj(&no_assets(), "quad.obj", &obj)).unwrap();

        assert_eq!(1, model.primitives.len());
        let primitive = &model.primitives[0];
        assert_eq!(6, primitive.mesh.indices.len());
        assert!(primitive
            .mesh
            .vertices
            .iter()
            .all(|v| v.normal == [0.0, 1.0, 0.0]));
        assert_eq!(Vec3::ONE, primitive.material.diffuse_color);
    }

    #[test]
    fn material_library_is_loaded_next_to_the_obj() {
        let dir = std::env::temp_dir().join(format!("underwater-obj-mtl-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("models")).unwrap();
        std::fs::write(
            dir.join("models/quad.mtl"),
            "newmtl sand\nKd 1.0 0.0 0.0\nNs 12.0\n",
        )
        .unwrap();

        let obj = format!("mtllib quad.mtl\no quad\nusemtl sand\n{QUAD_GEOMETRY}");
        let model =
            pollster::block_on(parse_obj(&AssetBase::new(&dir), "models/quad.obj", &obj)).unwrap();

        let material = &model.primitives[0].material;
        assert_eq!("sand", material.label);
        assert_eq!(Vec3::new(1.0, 0.0, 0.0), material.diffuse_color);
        assert_eq!(12.0, material.shininess);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_obj_is_malformed() {
        let result = pollster::block_on(parse_obj(&no_assets(), "empty.obj", "# nothing\n"));
        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }
}
