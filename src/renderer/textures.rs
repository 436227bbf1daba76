/// The depth buffer attached to the main render pass. It has to match the
/// surface size exactly, so a new one is created whenever the surface is
/// reconfigured.
pub struct DepthTexture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture sized to `surface`.
    pub fn new(device: &wgpu::Device, surface: &wgpu::SurfaceConfiguration) -> Self {
        // Including `TextureUsages::RENDER_ATTACHMENT` in the usage flags
        // ensures depth information can be written to this texture.
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth buffer"),
            size: wgpu::Extent3d {
                width: surface.width,
                height: surface.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    pub fn destroy(&self) {
        self.texture.destroy();
    }
}
