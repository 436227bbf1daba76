//! A render backend that keeps everything on the CPU so scene behavior can be
//! checked without a GPU.
use std::collections::VecDeque;

use slotmap::SlotMap;

use crate::content::{MaterialData, MeshData};

use super::{
    fit_surface_size, FrameDescription, GeometryKey, MaterialKey, OutstandingResources,
    RenderBackend, RenderError, ResourceReleaseError,
};

/// Records every call made against it and tracks live resources by key.
#[derive(Default)]
pub struct TrackingBackend {
    pub surface_size: (u32, u32),
    pub geometries: SlotMap<GeometryKey, MeshData>,
    pub materials: SlotMap<MaterialKey, MaterialData>,
    /// Every accepted surface resize, in call order.
    pub resizes: Vec<(u32, u32)>,
    /// Every frame that was drawn successfully.
    pub frames: Vec<FrameDescription>,
    /// Errors to return from upcoming draws instead of drawing.
    pub queued_draw_errors: VecDeque<RenderError>,
    /// Fail every material upload, as if the GPU ran out of memory.
    pub refuse_materials: bool,
    /// Largest surface side, unlimited when `None`.
    pub max_dimension: Option<u32>,
    pub surface_attached: bool,
    pub disposed: bool,
    pub dispose_calls: usize,
}

impl TrackingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface_size: (width, height),
            surface_attached: true,
            ..Default::default()
        }
    }
}

impl RenderBackend for TrackingBackend {
    fn resize_surface(&mut self, width: u32, height: u32) {
        assert!(width > 0 && height > 0, "zero sized surface");
        let size = fit_surface_size(width, height, self.max_surface_dimension());
        self.surface_size = size;
        self.resizes.push(size);
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn max_surface_dimension(&self) -> u32 {
        self.max_dimension.unwrap_or(u32::MAX)
    }

    fn create_geometry(&mut self, mesh: &MeshData) -> Result<GeometryKey, RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }

        Ok(self.geometries.insert(mesh.clone()))
    }

    fn create_material(&mut self, material: &MaterialData) -> Result<MaterialKey, RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }

        if self.refuse_materials {
            return Err(RenderError::OutOfMemory);
        }

        Ok(self.materials.insert(material.clone()))
    }

    fn release_geometry(&mut self, key: GeometryKey) -> Result<(), ResourceReleaseError> {
        self.geometries
            .remove(key)
            .map(|_| ())
            .ok_or(ResourceReleaseError::UnknownGeometry(key))
    }

    fn release_material(&mut self, key: MaterialKey) -> Result<(), ResourceReleaseError> {
        self.materials
            .remove(key)
            .map(|_| ())
            .ok_or(ResourceReleaseError::UnknownMaterial(key))
    }

    fn draw(&mut self, frame: &FrameDescription) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }

        if !self.surface_attached {
            return Err(RenderError::NoSurface);
        }

        if let Some(e) = self.queued_draw_errors.pop_front() {
            return Err(e);
        }

        for item in &frame.draws {
            if !self.geometries.contains_key(item.geometry) {
                return Err(RenderError::MissingResource("geometry"));
            }

            if !self.materials.contains_key(item.material) {
                return Err(RenderError::MissingResource("material"));
            }
        }

        self.frames.push(frame.clone());
        Ok(())
    }

    fn detach_surface(&mut self) {
        self.surface_attached = false;
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.dispose_calls += 1;
    }

    fn outstanding_resources(&self) -> OutstandingResources {
        OutstandingResources {
            geometries: self.geometries.len(),
            materials: self.materials.len(),
        }
    }
}
