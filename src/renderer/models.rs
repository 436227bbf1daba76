use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::content::{MaterialData, MeshData};

use super::{
    gpu_buffers::{DynamicGpuBuffer, UniformBindGroup},
    shaders::{BindGroupLayouts, PerMaterialUniforms, PerModelUniforms},
};

/// Vertex and index buffers for a single mesh, along with the per-model
/// uniforms that position it in the world.
///
/// Geometry is not shared between draws so the transform can live next to the
/// buffers it applies to.
pub struct GpuGeometry {
    label: String,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniforms: PerModelUniforms,
}

impl GpuGeometry {
    /// Copy `mesh` into new GPU buffers.
    pub fn new(device: &wgpu::Device, layouts: &BindGroupLayouts, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} vertex buffer", mesh.label)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} index buffer", mesh.label)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            label: mesh.label.clone(),
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            uniforms: PerModelUniforms::new(device, layouts, &mesh.label),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Set the transform used for the next draw and upload it if it changed.
    pub fn prepare(&mut self, queue: &wgpu::Queue, local_to_world: Mat4) {
        self.uniforms.set_local_to_world(local_to_world);

        if self.uniforms.is_dirty() {
            self.uniforms.update_gpu(queue);
        }
    }

    /// Free the GPU buffers owned by this geometry.
    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.uniforms.buffer.destroy();
    }
}

/// Phong material constants resident on the GPU.
pub struct GpuMaterial {
    uniforms: PerMaterialUniforms,
}

impl GpuMaterial {
    pub fn new(device: &wgpu::Device, layouts: &BindGroupLayouts, material: &MaterialData) -> Self {
        Self {
            uniforms: PerMaterialUniforms::new(device, layouts, material),
        }
    }

    pub fn destroy(&self) {
        self.uniforms.buffer.destroy();
    }
}

/// A trait for types that are capable of rendering geometry.
pub trait DrawModel<'a> {
    fn draw_geometry(&mut self, geometry: &'a GpuGeometry, material: &'a GpuMaterial);
}

impl<'rpass, 'a> DrawModel<'a> for wgpu::RenderPass<'rpass>
where
    'a: 'rpass,
{
    fn draw_geometry(&mut self, geometry: &'a GpuGeometry, material: &'a GpuMaterial) {
        debug_assert!(!geometry.uniforms.is_dirty());

        self.set_bind_group(1, geometry.uniforms.bind_group(), &[]);
        self.set_bind_group(2, material.uniforms.bind_group(), &[]);

        self.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
        self.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..geometry.index_count, 0, 0..1);
    }
}
