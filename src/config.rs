//! Tunable scene parameters.
//!
//! Every field has a default so a config file only needs to name the values it
//! changes. Colors are written as `0xRRGGBB` sRGB integers.
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Name of the environment variable pointing at an optional TOML config file.
pub const CONFIG_ENV_VAR: &str = "UNDERWATER_CONFIG";

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub environment: EnvironmentConfig,
    pub camera: CameraConfig,
    pub lights: LightsConfig,
    pub sea_floor: SeaFloorConfig,
    pub model: ModelConfig,
    pub animation: AnimationConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Underwater".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub clear_color: u32,
    pub fog_color: u32,
    /// Exponential squared fog density.
    pub fog_density: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            clear_color: 0x000000,
            fog_color: 0x03544e,
            fog_density: 0.1,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            z_near: 0.1,
            z_far: 1000.0,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightsConfig {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub point_color: u32,
    pub point_intensity: f32,
    /// Distance at which the point light fades out entirely. Zero disables the
    /// cutoff.
    pub point_range: f32,
    pub point_decay: f32,
    pub point_position: Vec3,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            ambient_color: 0x404040,
            ambient_intensity: 0.5,
            point_color: 0x7ec0ee,
            point_intensity: 1.0,
            point_range: 100.0,
            point_decay: 2.0,
            point_position: Vec3::new(0.0, 10.0, 0.0),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeaFloorConfig {
    pub width: f32,
    pub depth: f32,
    pub color: u32,
    /// Height of the floor plane.
    pub elevation: f32,
}

impl Default for SeaFloorConfig {
    fn default() -> Self {
        Self {
            width: 100.0,
            depth: 100.0,
            color: 0x0a0a0a,
            elevation: -5.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Locator of the model relative to the asset base.
    pub locator: String,
    /// Overrides where model locators are resolved from. Native builds default
    /// to the content directory copied next to the build output, web builds to
    /// the page origin.
    pub asset_base: Option<PathBuf>,
    pub position: Vec3,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            locator: "jellyfish.glb".to_string(),
            asset_base: None,
            position: Vec3::ZERO,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Radians the model turns around +Y every frame.
    pub rotation_step: f32,
    pub bob_amplitude: f32,
    /// Angular frequency of the bobbing motion in radians per second.
    pub bob_frequency: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            rotation_step: 0.005,
            bob_amplitude: 0.5,
            bob_frequency: 1.0,
        }
    }
}

impl SceneConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    /// Load the config file named by `UNDERWATER_CONFIG`, or the defaults when
    /// the variable is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                info!("loading scene config from {path:?}");
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scene config")]
    Parse(#[from] toml::de::Error),
}
