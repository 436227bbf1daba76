mod backend;
mod gpu_buffers;
pub mod meshes;
mod models;
pub mod shaders;
#[cfg(test)]
pub mod testing;
mod textures;

use std::sync::Arc;

use anyhow::Context;
use slotmap::SlotMap;
use tracing::{debug, info, warn};
use winit::window::Window;

pub use backend::{
    fit_surface_size, DrawItem, FogSettings, FrameDescription, GeometryKey, MaterialKey,
    OutstandingResources, RenderBackend, RenderError, ResourceReleaseError,
};

use crate::content::{MaterialData, MeshData};
use gpu_buffers::{DynamicGpuBuffer, UniformBindGroup};
use models::{DrawModel, GpuGeometry, GpuMaterial};
use shaders::{BindGroupLayouts, PerFrameUniforms};
use textures::DepthTexture;

/// Device level state that lives until the renderer is disposed.
struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    layouts: BindGroupLayouts,
    render_pipeline: wgpu::RenderPipeline,
    per_frame_uniforms: PerFrameUniforms,
    depth_texture: DepthTexture,
}

/// Draws the scene with wgpu into a window surface.
///
/// The surface and the device are held separately so the surface can be
/// detached from the window before the rest of the context is released.
pub struct WgpuRenderer {
    surface: Option<wgpu::Surface<'static>>,
    context: Option<GpuContext>,
    geometries: SlotMap<GeometryKey, GpuGeometry>,
    materials: SlotMap<MaterialKey, GpuMaterial>,
}

impl WgpuRenderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let window_size = window.inner_size();

        // Create a WGPU instance that can use any supported graphics API.
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create the main rendering surface and then get an adapter that acts
        // as the handle to one of the machine's physical GPU(s).
        let surface = instance
            .create_surface(window)
            .context("failed to create a rendering surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter is compatible with the window surface")?;

        info!("using graphics adapter {:?}", adapter.get_info());

        // Get a communication channel to the graphics card and a queue for
        // submitting commands to.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default()
                    },
                    label: None,
                },
                None,
            )
            .await
            .context("failed to acquire a graphics device")?;

        // Set the main rendering surface to use an sRGB texture, and then allow
        // all shaders to assume they are writing to an sRGB back buffer.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the rendering surface reports no supported formats")?;

        if surface_format.is_srgb() {
            info!("rendering surface supports sRGB");
        } else {
            info!("no sRGB support found for the main rendering surface, defaulting to first available");
        }

        // The window may not have a size yet (eg a canvas that is not laid
        // out). The first resize will fix it up.
        let (width, height) = fit_surface_size(
            window_size.width.max(1),
            window_size.height.max(1),
            device.limits().max_texture_dimension_2d,
        );
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        let layouts = BindGroupLayouts::new(&device);
        let per_frame_uniforms = PerFrameUniforms::new(&device, &layouts);
        let depth_texture = DepthTexture::new(&device, &surface_config);
        let render_pipeline = Self::create_render_pipeline(&device, &layouts, surface_format);

        Ok(Self {
            surface: Some(surface),
            context: Some(GpuContext {
                device,
                queue,
                surface_config,
                layouts,
                render_pipeline,
                per_frame_uniforms,
                depth_texture,
            }),
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
        })
    }

    fn create_render_pipeline(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lit fog shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("renderer/shader.wgsl").into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &layouts.ordered(),
                push_constant_ranges: &[],
            });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[shaders::Vertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Models may contain single sided quads that must be visible
                // from both sides.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTexture::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        })
    }
}

impl RenderBackend for WgpuRenderer {
    fn resize_surface(&mut self, width: u32, height: u32) {
        let Some(context) = self.context.as_mut() else {
            warn!("ignoring resize to {width}x{height} after the renderer was disposed");
            return;
        };

        let max_dimension = context.device.limits().max_texture_dimension_2d;
        let fitted = fit_surface_size(width, height, max_dimension);
        if fitted != (width, height) {
            warn!(
                "{width}x{height} exceeds the device limit of {max_dimension} pixels, using {}x{}",
                fitted.0, fitted.1
            );
        }
        let (width, height) = fitted;

        context.surface_config.width = width;
        context.surface_config.height = height;

        if let Some(surface) = &self.surface {
            surface.configure(&context.device, &context.surface_config);
        }

        // Recreate the depth buffer to match the new surface size.
        context.depth_texture.destroy();
        context.depth_texture = DepthTexture::new(&context.device, &context.surface_config);

        debug!("surface resized to {width}x{height}");
    }

    fn surface_size(&self) -> (u32, u32) {
        self.context
            .as_ref()
            .map(|c| (c.surface_config.width, c.surface_config.height))
            .unwrap_or_default()
    }

    fn max_surface_dimension(&self) -> u32 {
        self.context
            .as_ref()
            .map(|c| c.device.limits().max_texture_dimension_2d)
            .unwrap_or(u32::MAX)
    }

    fn create_geometry(&mut self, mesh: &MeshData) -> Result<GeometryKey, RenderError> {
        let context = self.context.as_ref().ok_or(RenderError::Disposed)?;
        let geometry = GpuGeometry::new(&context.device, &context.layouts, mesh);

        Ok(self.geometries.insert(geometry))
    }

    fn create_material(&mut self, material: &MaterialData) -> Result<MaterialKey, RenderError> {
        let context = self.context.as_ref().ok_or(RenderError::Disposed)?;
        let material = GpuMaterial::new(&context.device, &context.layouts, material);

        Ok(self.materials.insert(material))
    }

    fn release_geometry(&mut self, key: GeometryKey) -> Result<(), ResourceReleaseError> {
        let geometry = self
            .geometries
            .remove(key)
            .ok_or(ResourceReleaseError::UnknownGeometry(key))?;

        debug!("releasing geometry {}", geometry.label());
        geometry.destroy();

        Ok(())
    }

    fn release_material(&mut self, key: MaterialKey) -> Result<(), ResourceReleaseError> {
        self.materials
            .remove(key)
            .ok_or(ResourceReleaseError::UnknownMaterial(key))?
            .destroy();

        Ok(())
    }

    fn draw(&mut self, frame: &FrameDescription) -> Result<(), RenderError> {
        let context = self.context.as_mut().ok_or(RenderError::Disposed)?;
        let surface = self.surface.as_ref().ok_or(RenderError::NoSurface)?;

        // Upload transforms before the render pass borrows the geometry.
        for item in &frame.draws {
            if !self.materials.contains_key(item.material) {
                return Err(RenderError::MissingResource("material"));
            }

            self.geometries
                .get_mut(item.geometry)
                .ok_or(RenderError::MissingResource("geometry"))?
                .prepare(&context.queue, item.local_to_world);
        }

        context.per_frame_uniforms.set_frame(frame);
        context.per_frame_uniforms.update_gpu(&context.queue);

        let backbuffer = surface.get_current_texture()?;
        let view = backbuffer
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut command_encoder =
            context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render loop encoder"),
                });

        {
            let mut render_pass = command_encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: frame.clear_color.x as f64,
                            g: frame.clear_color.y as f64,
                            b: frame.clear_color.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &context.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&context.render_pipeline);
            render_pass.set_bind_group(0, context.per_frame_uniforms.bind_group(), &[]);

            for item in &frame.draws {
                if let (Some(geometry), Some(material)) = (
                    self.geometries.get(item.geometry),
                    self.materials.get(item.material),
                ) {
                    render_pass.draw_geometry(geometry, material);
                }
            }
        }

        context
            .queue
            .submit(std::iter::once(command_encoder.finish()));
        backbuffer.present();

        Ok(())
    }

    fn detach_surface(&mut self) {
        if self.surface.take().is_some() {
            debug!("rendering surface detached");
        }
    }

    fn dispose(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };

        let outstanding = self.outstanding_resources();
        if !outstanding.is_empty() {
            warn!("renderer disposed with live resources: {outstanding:?}");
        }

        for (_, geometry) in self.geometries.drain() {
            geometry.destroy();
        }

        for (_, material) in self.materials.drain() {
            material.destroy();
        }

        context.depth_texture.destroy();
        self.surface = None;

        info!("renderer disposed");
    }

    fn outstanding_resources(&self) -> OutstandingResources {
        OutstandingResources {
            geometries: self.geometries.len(),
            materials: self.materials.len(),
        }
    }
}
