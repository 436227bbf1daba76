use std::cell::Cell;

/// A GPU buffer that mirrors values held on the CPU.
pub trait DynamicGpuBuffer {
    /// Copy the CPU values to the GPU and clear the dirty flag.
    fn update_gpu(&self, queue: &wgpu::Queue);

    /// True if the CPU values changed since the last `update_gpu`.
    fn is_dirty(&self) -> bool;
}

pub trait UniformBindGroup {
    fn bind_group(&self) -> &wgpu::BindGroup;
}

/// One uniform struct bound at binding 0 of its own bind group.
#[derive(Debug)]
pub struct UniformBuffer<T: bytemuck::Pod> {
    values: T,
    gpu_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    is_dirty: Cell<bool>,
}

impl<T: bytemuck::Pod> UniformBuffer<T> {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        values: T,
        bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let gpu_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&values),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: gpu_buffer.as_entire_binding(),
            }],
        });

        Self {
            values,
            gpu_buffer,
            bind_group,
            is_dirty: Cell::new(false),
        }
    }

    pub fn values(&self) -> &T {
        &self.values
    }

    /// Replace the CPU values. The buffer is only marked dirty when the bytes
    /// differ from what is already stored.
    pub fn set(&mut self, values: T) {
        if bytemuck::bytes_of(&values) != bytemuck::bytes_of(&self.values) {
            self.values = values;
            self.is_dirty.set(true);
        }
    }

    /// Free the GPU memory now rather than when the last handle drops.
    pub fn destroy(&self) {
        self.gpu_buffer.destroy();
    }
}

impl<T: bytemuck::Pod> DynamicGpuBuffer for UniformBuffer<T> {
    fn update_gpu(&self, queue: &wgpu::Queue) {
        self.is_dirty.set(false);
        queue.write_buffer(&self.gpu_buffer, 0, bytemuck::bytes_of(&self.values));
    }

    fn is_dirty(&self) -> bool {
        self.is_dirty.get()
    }
}

impl<T: bytemuck::Pod> UniformBindGroup for UniformBuffer<T> {
    fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
