#[cfg(test)]
pub mod testing;

use anyhow::ensure;
use tracing::{debug, warn};

use crate::{
    camera::Camera,
    config::CameraConfig,
    renderer::{fit_surface_size, RenderBackend},
};

/// The surface a scene is mounted into, such as a native window or a canvas
/// inside a web page.
///
/// Resize notifications are queued by the host while a subscription is active
/// and drained by the scene at the start of each frame.
pub trait ViewportHost {
    /// Current drawable size in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Start queueing resize notifications.
    fn subscribe_resize(&mut self);

    /// Stop queueing resize notifications and drop any that are pending.
    fn unsubscribe_resize(&mut self);

    /// The most recent resize since the last call, if any.
    fn take_resize(&mut self) -> Option<(u32, u32)>;

    /// Ask for another frame at the next display refresh.
    fn request_frame(&mut self);

    /// Make the drawable surface part of the host container.
    fn attach_surface(&mut self);

    /// Remove the drawable surface from the host container.
    fn detach_surface(&mut self);
}

impl<T: ViewportHost + ?Sized> ViewportHost for &mut T {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn subscribe_resize(&mut self) {
        (**self).subscribe_resize()
    }

    fn unsubscribe_resize(&mut self) {
        (**self).unsubscribe_resize()
    }

    fn take_resize(&mut self) -> Option<(u32, u32)> {
        (**self).take_resize()
    }

    fn request_frame(&mut self) {
        (**self).request_frame()
    }

    fn attach_surface(&mut self) {
        (**self).attach_surface()
    }

    fn detach_surface(&mut self) {
        (**self).detach_surface()
    }
}

/// Result of a `ViewportManager::resize` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
    Resized,
    /// Same size as before, nothing was reconfigured.
    Unchanged,
    /// A zero dimension was requested and ignored.
    Rejected,
}

/// Keeps the camera projection and the drawable surface in step with the host
/// size.
pub struct ViewportManager {
    camera: Camera,
    width: u32,
    height: u32,
}

impl ViewportManager {
    /// Create a viewport with the camera described by `config`. A zero sized
    /// host is allowed and renders with a square aspect until the first valid
    /// resize arrives.
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> anyhow::Result<Self> {
        ensure!(
            config.fov_y_degrees > 0.0 && config.fov_y_degrees < 180.0,
            "camera field of view must be between 0 and 180 degrees, got {}",
            config.fov_y_degrees
        );
        ensure!(
            config.z_near > 0.0 && config.z_far > config.z_near,
            "camera clip planes must satisfy 0 < near < far, got {} and {}",
            config.z_near,
            config.z_far
        );
        ensure!(
            config.position != config.target,
            "camera position and target must differ"
        );

        let camera = Camera::new(
            config.position,
            config.target,
            glam::Vec3::Y,
            config.fov_y_degrees.to_radians(),
            config.z_near,
            config.z_far,
            width,
            height,
        );

        Ok(Self {
            camera,
            width,
            height,
        })
    }

    /// Apply a new host size to the camera and the backend surface.
    ///
    /// The camera always takes the aspect of the host size, even when the
    /// backend has to shrink the surface to fit its limits.
    pub fn resize<B>(&mut self, backend: &mut B, width: u32, height: u32) -> ResizeOutcome
    where
        B: RenderBackend + ?Sized,
    {
        if let Err(e) = self.camera.set_viewport_size(width, height) {
            warn!("{e}");
            return ResizeOutcome::Rejected;
        }

        if (width, height) == (self.width, self.height) && self.surface_matches(backend) {
            return ResizeOutcome::Unchanged;
        }

        debug!("viewport resized to {width}x{height}");

        self.width = width;
        self.height = height;
        backend.resize_surface(width, height);

        ResizeOutcome::Resized
    }

    /// Reconfigure the backend surface at the current size, eg after the
    /// surface was lost.
    pub fn reapply_surface_size<B>(&self, backend: &mut B)
    where
        B: RenderBackend + ?Sized,
    {
        if self.width > 0 && self.height > 0 {
            backend.resize_surface(self.width, self.height);
        }
    }

    /// True when the backend surface has the size this viewport would give it.
    pub fn surface_matches<B>(&self, backend: &B) -> bool
    where
        B: RenderBackend + ?Sized,
    {
        let expected = fit_surface_size(self.width, self.height, backend.max_surface_dimension());
        backend.surface_size() == expected
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::testing::TrackingBackend;

    fn viewport(width: u32, height: u32) -> ViewportManager {
        ViewportManager::new(&CameraConfig::default(), width, height).unwrap()
    }

    #[test]
    fn aspect_and_surface_follow_every_accepted_resize() {
        let mut backend = TrackingBackend::new(800, 600);
        let mut viewport = viewport(800, 600);

        let sizes = [
            (1024, 768),
            (0, 500),
            (1920, 1080),
            (1920, 1080),
            (300, 0),
            (1, 4000),
            (640, 480),
        ];

        let mut accepted = (800, 600);
        for (w, h) in sizes {
            viewport.resize(&mut backend, w, h);
            if w > 0 && h > 0 {
                accepted = (w, h);
            }

            assert_eq!(
                accepted.0 as f32 / accepted.1 as f32,
                viewport.camera().aspect()
            );
            assert_eq!(accepted, backend.surface_size());
            assert_eq!(accepted, viewport.size());
        }
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let mut backend = TrackingBackend::new(800, 600);
        let mut viewport = viewport(800, 600);

        assert_eq!(ResizeOutcome::Rejected, viewport.resize(&mut backend, 0, 0));
        assert_eq!(ResizeOutcome::Rejected, viewport.resize(&mut backend, 0, 10));
        assert!(backend.resizes.is_empty());
        assert_eq!(800.0 / 600.0, viewport.camera().aspect());
    }

    #[test]
    fn identical_size_does_not_reconfigure_surface() {
        let mut backend = TrackingBackend::new(800, 600);
        let mut viewport = viewport(800, 600);

        assert_eq!(ResizeOutcome::Unchanged, viewport.resize(&mut backend, 800, 600));
        assert_eq!(ResizeOutcome::Resized, viewport.resize(&mut backend, 1000, 500));
        assert_eq!(ResizeOutcome::Unchanged, viewport.resize(&mut backend, 1000, 500));
        assert_eq!(vec![(1000, 500)], backend.resizes);
    }

    #[test]
    fn zero_sized_host_waits_for_first_resize() {
        let mut backend = TrackingBackend::new(1, 1);
        let mut viewport = viewport(0, 0);
        assert_eq!(0.0, viewport.camera().aspect());

        assert_eq!(ResizeOutcome::Resized, viewport.resize(&mut backend, 400, 200));
        assert_eq!(2.0, viewport.camera().aspect());
    }

    #[test]
    fn invalid_camera_config_is_an_error() {
        let config = CameraConfig {
            fov_y_degrees: 0.0,
            ..Default::default()
        };
        assert!(ViewportManager::new(&config, 800, 600).is_err());

        let config = CameraConfig {
            z_near: 10.0,
            z_far: 1.0,
            ..Default::default()
        };
        assert!(ViewportManager::new(&config, 800, 600).is_err());
    }

    #[test]
    fn zero_near_plane_is_an_error() {
        let config = CameraConfig {
            z_near: 0.0,
            ..Default::default()
        };
        assert!(ViewportManager::new(&config, 800, 600).is_err());
    }

    #[test]
    fn oversized_host_is_clamped_but_keeps_its_aspect() {
        let mut backend = TrackingBackend::new(800, 600);
        backend.max_dimension = Some(2048);
        let mut viewport = viewport(800, 600);

        assert_eq!(ResizeOutcome::Resized, viewport.resize(&mut backend, 2560, 1440));
        assert_eq!((2048, 1152), backend.surface_size());
        assert_eq!((2560, 1440), viewport.size());
        assert_eq!(2560.0 / 1440.0, viewport.camera().aspect());

        assert_eq!(ResizeOutcome::Unchanged, viewport.resize(&mut backend, 2560, 1440));
        assert_eq!(vec![(2048, 1152)], backend.resizes);
    }
}
