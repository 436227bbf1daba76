//! NOTES:
//! Meshes vertex winding order is CCW.
//! Builtin meshes are ordered bottom left to bottom right.
use glam::Vec3;

use crate::content::MeshData;

use super::shaders::Vertex;

/// A flat rectangle centered on the origin in the XY plane, facing +Z.
///
/// Lay it flat as a floor by rotating -90 degrees about X.
pub fn plane(label: impl Into<String>, width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width * 0.5, height * 0.5);

    let vertices = [
        (Vec3::new(-hw, -hh, 0.0), [0.0, 1.0]),
        (Vec3::new(hw, -hh, 0.0), [1.0, 1.0]),
        (Vec3::new(-hw, hh, 0.0), [0.0, 0.0]),
        (Vec3::new(hw, hh, 0.0), [1.0, 0.0]),
    ]
    .into_iter()
    .map(|(position, tex_coords)| Vertex::new(position, Vec3::Z, tex_coords))
    .collect();

    MeshData {
        label: label.into(),
        vertices,
        indices: vec![0, 1, 2, 2, 1, 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_spans_requested_size() {
        let mesh = plane("floor", 100.0, 40.0);

        let max = mesh
            .vertices
            .iter()
            .fold(Vec3::splat(f32::MIN), |acc, v| acc.max(v.position.into()));
        let min = mesh
            .vertices
            .iter()
            .fold(Vec3::splat(f32::MAX), |acc, v| acc.min(v.position.into()));

        assert_eq!(Vec3::new(100.0, 40.0, 0.0), max - min);
        assert_eq!(6, mesh.indices.len());
    }

    #[test]
    fn plane_triangles_wind_towards_its_normal() {
        let mesh = plane("floor", 2.0, 2.0);

        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from(mesh.vertices[tri[i] as usize].position));
            assert!((b - a).cross(c - a).dot(Vec3::Z) > 0.0);
        }
    }
}
