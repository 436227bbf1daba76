use std::path::Path;

use futures::channel::oneshot;
use glam::{Mat4, Vec3};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    platform::{load_as_binary, AssetBase},
    renderer::shaders::Vertex,
};

mod gltf_model;
mod obj_model;

/// CPU side vertex and index data for one mesh.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub label: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Phong material properties.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialData {
    pub label: String,
    /// Linear RGB surface color.
    pub diffuse_color: Vec3,
    pub specular_color: Vec3,
    pub shininess: f32,
}

impl MaterialData {
    pub const DEFAULT_SPECULAR_COLOR: Vec3 = Vec3::new(0.067, 0.067, 0.067);
    pub const DEFAULT_SHININESS: f32 = 30.0;

    /// A material with the given color and default specular response.
    pub fn with_color(label: impl Into<String>, diffuse_color: Vec3) -> Self {
        Self {
            label: label.into(),
            diffuse_color,
            specular_color: Self::DEFAULT_SPECULAR_COLOR,
            shininess: Self::DEFAULT_SHININESS,
        }
    }
}

/// One drawable piece of a loaded model.
#[derive(Clone, Debug)]
pub struct ModelPrimitive {
    pub mesh: MeshData,
    pub material: MaterialData,
    /// Transform from the primitive's local space to the model root.
    pub local_transform: Mat4,
}

/// A fully parsed model that has not been uploaded to the GPU yet.
///
/// Model data is plain CPU memory so it can be produced off the frame thread
/// and handed over for upload.
#[derive(Clone, Debug)]
pub struct ModelData {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.mesh.vertices.len()).sum()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("asset locator {0:?} is empty or not relative to the asset base")]
    InvalidLocator(String),
    #[error("failed to read {locator:?}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {locator:?}: {reason}")]
    Fetch { locator: String, reason: String },
    #[error("{locator:?} is not a valid model: {reason}")]
    Malformed { locator: String, reason: String },
    #[error("{0:?} is not a supported model format")]
    UnsupportedFormat(String),
    #[error("model loader went away before finishing")]
    Abandoned,
}

/// Result of a finished model load.
pub type LoadResult = Result<ModelData, LoadError>;

/// Sending half of a model load. The loader completes it exactly once.
pub struct ModelCompletion {
    sender: oneshot::Sender<LoadResult>,
}

impl ModelCompletion {
    /// Post the load result back to the scene.
    ///
    /// Returns false when the scene was torn down while the load was in
    /// flight, in which case the result is dropped without touching any scene
    /// state.
    pub fn complete(self, result: LoadResult) -> bool {
        match self.sender.send(result) {
            Ok(()) => true,
            Err(_) => {
                debug!("scene is gone, discarding model load result");
                false
            }
        }
    }

    /// True if the receiving scene has been torn down.
    pub fn is_canceled(&self) -> bool {
        self.sender.is_canceled()
    }
}

/// Receiving half of a model load, polled once per frame by the scene.
pub struct PendingModel {
    receiver: Option<oneshot::Receiver<LoadResult>>,
}

impl PendingModel {
    /// Create a connected completion/pending pair.
    pub fn channel() -> (ModelCompletion, PendingModel) {
        let (sender, receiver) = oneshot::channel();
        (
            ModelCompletion { sender },
            PendingModel {
                receiver: Some(receiver),
            },
        )
    }

    /// Check for a finished load without blocking. Yields a result at most once.
    pub fn poll(&mut self) -> Option<LoadResult> {
        let receiver = self.receiver.as_mut()?;

        match receiver.try_recv() {
            Ok(None) => None,
            Ok(Some(result)) => {
                self.receiver = None;
                Some(result)
            }
            Err(oneshot::Canceled) => {
                self.receiver = None;
                Some(Err(LoadError::Abandoned))
            }
        }
    }

    /// True while a result has not been received yet.
    pub fn is_outstanding(&self) -> bool {
        self.receiver.is_some()
    }
}

/// Starts model loads on behalf of a scene.
pub trait ModelLoader {
    /// Begin loading `locator` in the background. The scene polls the returned
    /// handle each frame.
    fn start(&self, locator: &str) -> PendingModel;
}

/// Loads models from the asset base, off the frame thread.
#[derive(Clone, Debug)]
pub struct AssetLoader {
    base: AssetBase,
}

impl AssetLoader {
    pub fn new(base: AssetBase) -> Self {
        Self { base }
    }

    /// Fetch and parse the model at `locator`. The parser is picked from the
    /// locator's file extension.
    pub async fn load(&self, locator: &str) -> LoadResult {
        load_model(&self.base, locator).await
    }
}

impl ModelLoader for AssetLoader {
    fn start(&self, locator: &str) -> PendingModel {
        let (completion, pending) = PendingModel::channel();
        let base = self.base.clone();
        let locator = locator.to_string();

        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                wasm_bindgen_futures::spawn_local(async move {
                    completion.complete(load_model(&base, &locator).await);
                });
            } else {
                let spawned = std::thread::Builder::new()
                    .name("model-loader".to_string())
                    .spawn(move || {
                        let result = pollster::block_on(load_model(&base, &locator));
                        completion.complete(result);
                    });

                // Dropping the completion inside the failed closure surfaces as
                // `LoadError::Abandoned` on the next poll.
                if let Err(e) = spawned {
                    tracing::error!("failed to spawn model loader thread: {e}");
                }
            }
        }

        pending
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ModelFormat {
    Glb,
    Obj,
}

impl ModelFormat {
    fn from_locator(locator: &str) -> Option<Self> {
        let extension = Path::new(locator).extension()?.to_str()?;

        match extension.to_ascii_lowercase().as_str() {
            "glb" => Some(ModelFormat::Glb),
            "obj" => Some(ModelFormat::Obj),
            _ => None,
        }
    }
}

#[tracing::instrument(level = "info", skip(base))]
async fn load_model(base: &AssetBase, locator: &str) -> LoadResult {
    let format = ModelFormat::from_locator(locator)
        .ok_or_else(|| LoadError::UnsupportedFormat(locator.to_string()))?;

    let model = match format {
        ModelFormat::Glb => {
            let bytes = load_as_binary(base, locator).await?;
            gltf_model::parse_glb(&bytes, locator)?
        }
        ModelFormat::Obj => obj_model::load_obj_model(base, locator).await?,
    };

    info!(
        "loaded model {:?} with {} primitives and {} vertices",
        model.name,
        model.primitives.len(),
        model.vertex_count()
    );

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_picked_from_extension() {
        assert_eq!(Some(ModelFormat::Glb), ModelFormat::from_locator("a/jellyfish.glb"));
        assert_eq!(Some(ModelFormat::Glb), ModelFormat::from_locator("JELLY.GLB"));
        assert_eq!(Some(ModelFormat::Obj), ModelFormat::from_locator("cube.obj"));
        assert_eq!(None, ModelFormat::from_locator("scene.fbx"));
        assert_eq!(None, ModelFormat::from_locator("no_extension"));
    }

    #[test]
    fn unsupported_format_fails_without_touching_disk() {
        let loader = AssetLoader::new(AssetBase::new("/does/not/exist"));
        let result = pollster::block_on(loader.load("whale.fbx"));
        assert!(matches!(result, Err(LoadError::UnsupportedFormat(_))));
    }

    #[test]
    fn pending_model_yields_result_once() {
        let (completion, mut pending) = PendingModel::channel();
        assert!(pending.poll().is_none());
        assert!(pending.is_outstanding());

        assert!(completion.complete(Err(LoadError::UnsupportedFormat("x".into()))));

        assert!(matches!(pending.poll(), Some(Err(LoadError::UnsupportedFormat(_)))));
        assert!(!pending.is_outstanding());
        assert!(pending.poll().is_none());
    }

    #[test]
    fn dropped_completion_reports_abandoned() {
        let (completion, mut pending) = PendingModel::channel();
        drop(completion);
        assert!(matches!(pending.poll(), Some(Err(LoadError::Abandoned))));
        assert!(pending.poll().is_none());
    }

    #[test]
    fn completion_after_scene_is_gone_is_discarded() {
        let (completion, pending) = PendingModel::channel();
        drop(pending);
        assert!(completion.is_canceled());
        assert!(!completion.complete(Err(LoadError::Abandoned)));
    }

    #[test]
    fn background_load_reports_missing_asset() {
        let loader = AssetLoader::new(AssetBase::new(
            std::env::temp_dir().join("underwater-no-assets-here"),
        ));
        let mut pending = loader.start("jellyfish.glb");

        let result = loop {
            if let Some(result) = pending.poll() {
                break result;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        };

        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn background_load_reports_empty_accessor_as_malformed() {
        let dir = std::env::temp_dir().join(format!(
            "underwater-empty-glb-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("empty.glb"),
            gltf_model::tests::empty_positions_glb(),
        )
        .unwrap();

        let mut pending = AssetLoader::new(AssetBase::new(&dir)).start("empty.glb");

        let result = loop {
            if let Some(result) = pending.poll() {
                break result;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        };

        std::fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn bundled_jellyfish_loads() {
        let loader = AssetLoader::new(AssetBase::bundled());
        let model = pollster::block_on(loader.load("jellyfish.glb")).unwrap();
        assert!(!model.primitives.is_empty());
        assert!(model.vertex_count() > 0);
    }
}
