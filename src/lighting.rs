use glam::Vec3;

/// A light placed in the scene.
#[derive(Clone, Debug, PartialEq)]
pub enum Light {
    /// Lights every surface equally regardless of position or orientation.
    Ambient(AmbientLight),
    /// Emits light in all directions from a single point.
    Point(PointLight),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    /// Linear RGB color of the light.
    pub color: Vec3,
    pub intensity: f32,
}

impl AmbientLight {
    /// The color contribution of this light after intensity is applied.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    /// The world position of the light.
    pub position: Vec3,
    /// Linear RGB color of the light.
    pub color: Vec3,
    pub intensity: f32,
    /// Distance at which the light's contribution reaches zero. A range of zero
    /// means the light is never cut off.
    pub range: f32,
    /// How quickly the light dims over `range`.
    pub decay: f32,
}
