pub mod packed_structs;

use glam::{Mat4, Vec3, Vec4};

use crate::content::MaterialData;

use super::{
    backend::FrameDescription,
    gpu_buffers::{DynamicGpuBuffer, UniformBindGroup, UniformBuffer},
};
use packed_structs::{vec3_w, PackedMaterialConstants, PackedPointLight};

/// Maximum number of point lights the lighting shader evaluates per fragment.
/// Must match `MAX_POINT_LIGHTS` in `shader.wgsl`.
pub const MAX_POINT_LIGHTS: usize = 4;

/// Per-frame uniform values used by the lighting shader.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PerFrameBufferData {
    pub view_projection: Mat4,
    pub view_pos: Vec4,
    pub fog: Vec4,     // .xyz is fog color, .w is density.
    pub ambient: Vec4, // .w is unused.
    pub point_lights: [PackedPointLight; MAX_POINT_LIGHTS],
    pub point_light_count: u32,
    pub _padding: [u32; 3],
}

/// Responsible for storing per-frame shader uniform values and copying them to
/// a GPU backed buffer accessible to shaders.
pub struct PerFrameUniforms {
    pub buffer: UniformBuffer<PerFrameBufferData>,
}

impl PerFrameUniforms {
    /// Create a new per frame uniform buffer. Only one instance is needed per
    /// renderer.
    pub fn new(device: &wgpu::Device, layouts: &BindGroupLayouts) -> Self {
        Self {
            buffer: UniformBuffer::new(
                device,
                "per-frame uniforms",
                Default::default(),
                &layouts.per_frame_layout,
            ),
        }
    }

    /// Copy camera, fog and lighting values for the upcoming frame. Lights past
    /// `MAX_POINT_LIGHTS` are ignored.
    pub fn set_frame(&mut self, frame: &FrameDescription) {
        let mut values = PerFrameBufferData {
            view_projection: frame.view_projection,
            view_pos: vec3_w(frame.eye, 1.0),
            fog: frame.fog.packed(),
            ambient: vec3_w(frame.ambient, 0.0),
            point_light_count: frame.point_lights.len().min(MAX_POINT_LIGHTS) as u32,
            ..Default::default()
        };

        for (slot, light) in values.point_lights.iter_mut().zip(&frame.point_lights) {
            *slot = light.into();
        }

        self.buffer.set(values);
    }
}

impl DynamicGpuBuffer for PerFrameUniforms {
    fn update_gpu(&self, queue: &wgpu::Queue) {
        self.buffer.update_gpu(queue)
    }

    fn is_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }
}

impl UniformBindGroup for PerFrameUniforms {
    fn bind_group(&self) -> &wgpu::BindGroup {
        self.buffer.bind_group()
    }
}

/// Per-model uniform values that are used by the lighting shader.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PerModelBufferData {
    pub local_to_world: Mat4,
    /// Inverse transpose of `local_to_world`, used to transform normals.
    pub normal_to_world: Mat4,
}

/// Responsible for storing per-model shader uniform values and copying them to
/// a GPU backed buffer accessible to shaders.
#[derive(Debug)]
pub struct PerModelUniforms {
    pub buffer: UniformBuffer<PerModelBufferData>,
}

impl PerModelUniforms {
    /// Create a new PerModelUniforms object. One instance per geometry.
    pub fn new(device: &wgpu::Device, layouts: &BindGroupLayouts, label: &str) -> Self {
        Self {
            buffer: UniformBuffer::new(
                device,
                &format!("{label} per-model uniforms"),
                PerModelBufferData {
                    local_to_world: Mat4::IDENTITY,
                    normal_to_world: Mat4::IDENTITY,
                },
                &layouts.per_model_layout,
            ),
        }
    }

    /// Set local to world transform matrix. Only marks the buffer dirty when
    /// the transform actually changed.
    pub fn set_local_to_world(&mut self, local_to_world: Mat4) {
        if self.buffer.values().local_to_world != local_to_world {
            self.buffer.set(PerModelBufferData {
                local_to_world,
                normal_to_world: local_to_world.inverse().transpose(),
            });
        }
    }
}

impl DynamicGpuBuffer for PerModelUniforms {
    fn update_gpu(&self, queue: &wgpu::Queue) {
        self.buffer.update_gpu(queue)
    }

    fn is_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }
}

impl UniformBindGroup for PerModelUniforms {
    fn bind_group(&self) -> &wgpu::BindGroup {
        self.buffer.bind_group()
    }
}

/// Uniform values describing a single material.
#[derive(Debug)]
pub struct PerMaterialUniforms {
    pub buffer: UniformBuffer<PackedMaterialConstants>,
}

impl PerMaterialUniforms {
    pub fn new(device: &wgpu::Device, layouts: &BindGroupLayouts, material: &MaterialData) -> Self {
        Self {
            buffer: UniformBuffer::new(
                device,
                &format!("{} material uniforms", material.label),
                material.into(),
                &layouts.per_material_layout,
            ),
        }
    }
}

impl UniformBindGroup for PerMaterialUniforms {
    fn bind_group(&self) -> &wgpu::BindGroup {
        self.buffer.bind_group()
    }
}

/// A registry of bind group layouts used by this renderer.
pub struct BindGroupLayouts {
    pub per_frame_layout: wgpu::BindGroupLayout,
    pub per_model_layout: wgpu::BindGroupLayout,
    pub per_material_layout: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    /// Create a new bind group layout registry.
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            per_frame_layout: device
                .create_bind_group_layout(&Self::uniform_desc("per-frame bind group layout")),
            per_model_layout: device
                .create_bind_group_layout(&Self::uniform_desc("per-model bind group layout")),
            per_material_layout: device
                .create_bind_group_layout(&Self::uniform_desc("per-material bind group layout")),
        }
    }

    /// All three groups hold a single uniform buffer at binding 0.
    fn uniform_desc(label: &'static str) -> wgpu::BindGroupLayoutDescriptor<'static> {
        wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        }
    }

    /// Layouts in bind group slot order.
    pub fn ordered(&self) -> [&wgpu::BindGroupLayout; 3] {
        [
            &self.per_frame_layout,
            &self.per_model_layout,
            &self.per_material_layout,
        ]
    }
}

/// Mesh vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, tex_coords: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            tex_coords,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress
                        + std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_frame_data_matches_shader_layout() {
        // mat4 + 3 vec4 + 4 lights * 3 vec4 + count padded to 16 bytes.
        assert_eq!(
            64 + 3 * 16 + MAX_POINT_LIGHTS * 48 + 16,
            std::mem::size_of::<PerFrameBufferData>()
        );
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(32, std::mem::size_of::<Vertex>());
    }
}
