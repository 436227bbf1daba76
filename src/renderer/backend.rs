use glam::{Mat4, Vec3, Vec4};
use slotmap::new_key_type;
use thiserror::Error;

use crate::content::{MaterialData, MeshData};
use crate::lighting::PointLight;

new_key_type! {
    /// Identifies a vertex/index buffer pair owned by a render backend.
    pub struct GeometryKey;

    /// Identifies a material owned by a render backend.
    pub struct MaterialKey;
}

/// The seam between the scene and the GPU.
///
/// Every GPU resident resource is created through a backend and has exactly one
/// owner on the scene side that is responsible for releasing it. Backends
/// track what is still alive so teardown can check that nothing leaked.
pub trait RenderBackend {
    /// Reconfigure the drawable surface to a new size in pixels. Callers never
    /// pass a zero dimension. Sizes larger than `max_surface_dimension` are
    /// scaled down to fit, keeping the aspect ratio.
    fn resize_surface(&mut self, width: u32, height: u32);

    /// Current size of the drawable surface in pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Largest width or height the surface can be configured with.
    fn max_surface_dimension(&self) -> u32;

    /// Upload mesh data to the GPU.
    fn create_geometry(&mut self, mesh: &MeshData) -> Result<GeometryKey, RenderError>;

    /// Upload material properties to the GPU.
    fn create_material(&mut self, material: &MaterialData) -> Result<MaterialKey, RenderError>;

    /// Release a geometry. Releasing an unknown or already released key is an
    /// error the caller is expected to log and move past.
    fn release_geometry(&mut self, key: GeometryKey) -> Result<(), ResourceReleaseError>;

    /// Release a material.
    fn release_material(&mut self, key: MaterialKey) -> Result<(), ResourceReleaseError>;

    /// Draw one frame.
    fn draw(&mut self, frame: &FrameDescription) -> Result<(), RenderError>;

    /// Drop the drawable surface. No frames can be drawn afterwards.
    fn detach_surface(&mut self);

    /// Release the renderer context itself. Safe to call more than once.
    fn dispose(&mut self);

    /// Number of geometries and materials that have not been released.
    fn outstanding_resources(&self) -> OutstandingResources;
}

impl<T: RenderBackend + ?Sized> RenderBackend for &mut T {
    fn resize_surface(&mut self, width: u32, height: u32) {
        (**self).resize_surface(width, height)
    }

    fn surface_size(&self) -> (u32, u32) {
        (**self).surface_size()
    }

    fn max_surface_dimension(&self) -> u32 {
        (**self).max_surface_dimension()
    }

    fn create_geometry(&mut self, mesh: &MeshData) -> Result<GeometryKey, RenderError> {
        (**self).create_geometry(mesh)
    }

    fn create_material(&mut self, material: &MaterialData) -> Result<MaterialKey, RenderError> {
        (**self).create_material(material)
    }

    fn release_geometry(&mut self, key: GeometryKey) -> Result<(), ResourceReleaseError> {
        (**self).release_geometry(key)
    }

    fn release_material(&mut self, key: MaterialKey) -> Result<(), ResourceReleaseError> {
        (**self).release_material(key)
    }

    fn draw(&mut self, frame: &FrameDescription) -> Result<(), RenderError> {
        (**self).draw(frame)
    }

    fn detach_surface(&mut self) {
        (**self).detach_surface()
    }

    fn dispose(&mut self) {
        (**self).dispose()
    }

    fn outstanding_resources(&self) -> OutstandingResources {
        (**self).outstanding_resources()
    }
}

/// Scale `width` x `height` down so neither side exceeds `max_dimension`,
/// keeping the aspect ratio as close as whole pixels allow.
pub fn fit_surface_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let aspect = width as f64 / height as f64;
    if width >= height {
        let fitted = (max_dimension as f64 / aspect).round().max(1.0) as u32;
        (max_dimension, fitted.min(max_dimension))
    } else {
        let fitted = (max_dimension as f64 * aspect).round().max(1.0) as u32;
        (fitted.min(max_dimension), max_dimension)
    }
}

/// Counts of live GPU resources held by a backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutstandingResources {
    pub geometries: usize,
    pub materials: usize,
}

impl OutstandingResources {
    pub fn is_empty(&self) -> bool {
        self.geometries == 0 && self.materials == 0
    }
}

/// Everything a backend needs to draw a frame, already flattened from the
/// scene graph in traversal order.
#[derive(Clone, Debug)]
pub struct FrameDescription {
    pub clear_color: Vec3,
    pub fog: FogSettings,
    pub view_projection: Mat4,
    pub eye: Vec3,
    /// Sum of all ambient lights, already scaled by intensity.
    pub ambient: Vec3,
    pub point_lights: Vec<PointLight>,
    pub draws: Vec<DrawItem>,
}

/// Exponential squared fog.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FogSettings {
    pub color: Vec3,
    pub density: f32,
}

impl FogSettings {
    /// Pack as `rgb = color, w = density` for the shader.
    pub fn packed(&self) -> Vec4 {
        self.color.extend(self.density)
    }
}

/// A single draw call.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem {
    pub geometry: GeometryKey,
    pub material: MaterialKey,
    pub local_to_world: Mat4,
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// The surface needs to be reconfigured before drawing again.
    #[error("drawable surface was lost or is outdated")]
    SurfaceLost,
    #[error("timed out waiting for the next surface texture")]
    Timeout,
    #[error("GPU is out of memory")]
    OutOfMemory,
    #[error("no drawable surface is attached")]
    NoSurface,
    #[error("draw referenced a released or unknown {0}")]
    MissingResource(&'static str),
    #[error("renderer context has been disposed")]
    Disposed,
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(e: wgpu::SurfaceError) -> Self {
        match e {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => RenderError::SurfaceLost,
            wgpu::SurfaceError::Timeout => RenderError::Timeout,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceReleaseError {
    #[error("geometry {0:?} was already released or never existed")]
    UnknownGeometry(GeometryKey),
    #[error("material {0:?} was already released or never existed")]
    UnknownMaterial(MaterialKey),
}
