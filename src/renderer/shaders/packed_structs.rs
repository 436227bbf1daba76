//! Rust structs with memory layouts that match their same named counterparts
//! in `shader.wgsl`.
//!
//! Data is packed as tightly as possible, and any gaps after a Vec3 field are
//! used for an extra scalar. For example the packed point light stores its
//! intensity in `color.w`.
//!
//! These structs must exactly match the memory layout whenever their
//! representation is changed in shader code or vice versa. All fields are
//! aligned to 16 bytes (eg `Vec4`) as WebGPU requires for uniform buffers.
use glam::{Vec3, Vec4};

use crate::{content::MaterialData, lighting::PointLight};

/// Rust struct with the same memory layout as `PackedMaterialConstants` in the
/// shader.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedMaterialConstants {
    pub diffuse_color: Vec4,  // .w is unused.
    pub specular_color: Vec4, // .w is shininess.
}

impl From<&MaterialData> for PackedMaterialConstants {
    fn from(val: &MaterialData) -> Self {
        Self {
            diffuse_color: vec3_w(val.diffuse_color, 0.0),
            specular_color: vec3_w(val.specular_color, val.shininess),
        }
    }
}

/// Rust struct with the same memory layout as `PackedPointLight` in the shader.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedPointLight {
    pub position: Vec4, // .w is range.
    pub color: Vec4,    // .w is intensity.
    pub falloff: Vec4,  // .x is decay, .yzw unused.
}

impl From<&PointLight> for PackedPointLight {
    fn from(val: &PointLight) -> Self {
        Self {
            position: vec3_w(val.position, val.range),
            color: vec3_w(val.color, val.intensity),
            falloff: Vec4::new(val.decay, 0.0, 0.0, 0.0),
        }
    }
}

/// Returns a new `Vec4` value that is the combination of a `Vec3` x, y and z
/// and an additional `w` value.
pub fn vec3_w(xyz: Vec3, w: f32) -> Vec4 {
    Vec4::new(xyz.x, xyz.y, xyz.z, w)
}
