use glam::{Mat4, Vec3};
use thiserror::Error;

/// Camera assumes a right-handed system with the +Z axis going _out_ of the
/// screen rather than in.
///
/// The following transforms points from local space to clip space:
///  `V_clip = M_projection * M_view * M_model * M_local`
///
/// The aspect ratio is never set directly. It is derived from the viewport
/// size handed to `set_viewport_size`, which is only called by the viewport
/// manager.
#[derive(Clone, Debug)]
pub struct Camera {
    /// The position of the camera in world space.
    eye: Vec3,
    /// The target position the camera should look at.
    target: Vec3,
    /// The camera's up direction.
    up: Vec3,
    /// The ratio of the viewport width to its height. An example is if the view
    /// is one unit high and two units wide then the aspect ratio is 2/1.
    aspect: f32,
    /// The vertical field of view for the camera, in radians.
    fov_y: f32,
    /// The minimum camera view distance. Fragments closer than `z_near` will not
    /// be rendered.
    z_near: f32,
    /// The maximum camera view distance. Fragments further than `z_far` will not
    /// be rendered.
    z_far: f32,
    viewport_width: u32,
    viewport_height: u32,
}

impl Camera {
    /// Create a new camera centered at `eye` with the center of the view
    /// aiming at `target` with `up` as the camera's upward direction.
    ///
    /// The aspect ratio is set to zero if either the viewport width or height
    /// is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y: f32,
        z_near: f32,
        z_far: f32,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Self {
        assert!(fov_y > 0.0);
        assert!(z_near > 0.0);
        assert!(z_far > z_near);
        assert!(eye != target);

        Self {
            eye,
            target,
            up: up.normalize(),
            aspect: if viewport_width > 0 && viewport_height > 0 {
                viewport_width as f32 / viewport_height as f32
            } else {
                0.0
            },
            fov_y,
            z_near,
            z_far,
            viewport_width,
            viewport_height,
        }
    }

    /// Get the camera's view matrix.
    ///
    /// A view matrix transforms coordinates from world space to view space, with
    /// the eye at the origin looking down the -Z axis.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Get the camera's perspective projection matrix.
    ///
    /// A camera that has never been given a valid viewport falls back to a
    /// square projection rather than producing NaNs.
    pub fn projection_matrix(&self) -> Mat4 {
        let aspect = if self.aspect > 0.0 { self.aspect } else { 1.0 };
        Mat4::perspective_rh(self.fov_y, aspect, self.z_near, self.z_far)
    }

    /// Get the camera's view projection matrix. The view projection matrix will
    /// transform points from world space to clip space.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Resize the camera's viewport and recompute the aspect ratio.
    pub fn set_viewport_size(
        &mut self,
        new_width: u32,
        new_height: u32,
    ) -> Result<(), InvalidCameraSize> {
        if new_width > 0 && new_height > 0 {
            self.aspect = new_width as f32 / new_height as f32;
            self.viewport_width = new_width;
            self.viewport_height = new_height;
            Ok(())
        } else {
            Err(InvalidCameraSize(new_width, new_height))
        }
    }

    /// Get the position of the camera in world space.
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Get the point at which the camera is focused on.
    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Vertical field of view in radians.
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    /// Get the camera viewport width in pixels.
    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    /// Get the camera viewport height in pixels.
    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }
}

#[derive(Debug, Error)]
#[error("camera viewport width and height must be larger than zero but width was {} and height was {}", .0, .1)]
pub struct InvalidCameraSize(u32, u32);
