use std::time::Duration;

use anyhow::Context;
use glam::Vec3;
use tracing::{debug, error, info, warn};

use crate::{
    animation::{AnimationDriver, DriverState, ModelMotion},
    config::SceneConfig,
    content::{
        LoadError, LoadResult, MaterialData, MeshData, ModelData, ModelLoader, PendingModel,
    },
    lighting::{AmbientLight, Light, PointLight},
    math_utils::color_from_hex,
    renderer::{
        meshes, FogSettings, GeometryKey, OutstandingResources, RenderBackend, RenderError,
    },
    scene::{
        MeshInstance, ModelInstance, ModelPart, ModelSlot, NodePayload, RenderableNode,
        SceneGraph, Transform,
    },
    viewport::{ResizeOutcome, ViewportHost, ViewportManager},
};

/// What happened when the host asked for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// The frame could not be drawn and was dropped. The next one is still
    /// scheduled.
    Skipped,
    /// The scene is stopped or torn down, nothing was done.
    Stopped,
}

/// A running underwater scene mounted into a host.
///
/// Created with `create`, driven by calling `frame` whenever the host presents
/// a frame, and released with `teardown` (or by dropping it).
pub struct SceneLifecycle<H: ViewportHost, B: RenderBackend> {
    host: H,
    backend: B,
    viewport: ViewportManager,
    scene: SceneGraph,
    driver: AnimationDriver,
    pending_model: Option<PendingModel>,
    model_load_error: Option<LoadError>,
    model_transform: Transform,
    resize_subscribed: bool,
    surface_attached: bool,
    torn_down: bool,
}

impl<H: ViewportHost, B: RenderBackend> SceneLifecycle<H, B> {
    /// Build the scene and start animating.
    ///
    /// Startup order is surface, camera, lights, static geometry, model load
    /// and then the animation loop. If any step fails everything acquired so
    /// far is released before the error is returned.
    pub fn create(
        mut host: H,
        backend: B,
        loader: &dyn ModelLoader,
        config: &SceneConfig,
    ) -> anyhow::Result<Self> {
        host.attach_surface();

        let (width, height) = host.size();
        let viewport = match ViewportManager::new(&config.camera, width, height) {
            Ok(viewport) => viewport,
            Err(e) => {
                host.detach_surface();
                let mut backend = backend;
                backend.detach_surface();
                backend.dispose();
                return Err(e.context("failed to set up the scene camera"));
            }
        };

        let environment = &config.environment;
        let scene = SceneGraph::new(
            color_from_hex(environment.clear_color),
            FogSettings {
                color: color_from_hex(environment.fog_color),
                density: environment.fog_density,
            },
        );

        let mut lifecycle = Self {
            host,
            backend,
            viewport,
            scene,
            driver: AnimationDriver::new(ModelMotion::new(
                &config.animation,
                config.model.position.y,
            )),
            pending_model: None,
            model_load_error: None,
            model_transform: Transform::from_translation(config.model.position),
            resize_subscribed: false,
            surface_attached: true,
            torn_down: false,
        };

        if let Err(e) = lifecycle.start(loader, config) {
            error!("scene startup failed, releasing partially built scene");
            lifecycle.teardown();
            return Err(e);
        }

        Ok(lifecycle)
    }

    fn start(&mut self, loader: &dyn ModelLoader, config: &SceneConfig) -> anyhow::Result<()> {
        // The backend surface may have been created before the host settled on
        // its final size.
        let size = self.viewport.size();
        if size.0 > 0 && size.1 > 0 && !self.viewport.surface_matches(&self.backend) {
            self.viewport.reapply_surface_size(&mut self.backend);
        }

        self.add_lights(config);
        self.add_sea_floor(config)
            .context("failed to create the sea floor")?;

        self.host.subscribe_resize();
        self.resize_subscribed = true;

        info!("starting load of model {:?}", config.model.locator);
        self.pending_model = Some(loader.start(&config.model.locator));

        self.driver.start();
        self.host.request_frame();

        Ok(())
    }

    fn add_lights(&mut self, config: &SceneConfig) {
        let lights = &config.lights;

        self.scene.add_node(RenderableNode::light(
            "ambient light",
            Light::Ambient(AmbientLight {
                color: color_from_hex(lights.ambient_color),
                intensity: lights.ambient_intensity,
            }),
        ));

        self.scene.add_node(RenderableNode::light(
            "point light",
            Light::Point(PointLight {
                position: lights.point_position,
                color: color_from_hex(lights.point_color),
                intensity: lights.point_intensity,
                range: lights.point_range,
                decay: lights.point_decay,
            }),
        ));
    }

    fn add_sea_floor(&mut self, config: &SceneConfig) -> Result<(), RenderError> {
        let floor = &config.sea_floor;
        let mesh = meshes::plane("sea floor", floor.width, floor.depth);
        let material = MaterialData::with_color("sea floor", color_from_hex(floor.color));

        let mesh = self.upload_mesh(&mesh, &material)?;

        self.scene.add_node(RenderableNode::mesh(
            "sea floor",
            Transform {
                translation: Vec3::new(0.0, floor.elevation, 0.0),
                rotation: Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0),
                scale: Vec3::ONE,
            },
            mesh,
        ));

        Ok(())
    }

    /// Produce one frame. Called by the host once per display refresh.
    pub fn frame(&mut self, delta: Duration) -> FrameOutcome {
        if self.torn_down || !self.driver.is_running() {
            return FrameOutcome::Stopped;
        }

        if let Some((width, height)) = self.host.take_resize() {
            self.resize(width, height);
        }

        self.poll_model_load();
        self.driver.tick(delta, &mut self.scene);

        let frame = self.scene.frame_description(self.viewport.camera());
        let outcome = match self.backend.draw(&frame) {
            Ok(()) => {
                self.driver.frame_drawn();
                FrameOutcome::Drawn
            }
            Err(RenderError::SurfaceLost) => {
                warn!("handling surface lost or outdated event by re-applying current viewport size");
                self.viewport.reapply_surface_size(&mut self.backend);
                FrameOutcome::Skipped
            }
            Err(e @ (RenderError::OutOfMemory | RenderError::Timeout)) => {
                error!("{e}, skipping frame");
                FrameOutcome::Skipped
            }
            Err(e) => {
                error!("failed to draw frame, will skip it and try to ignore: {e}");
                FrameOutcome::Skipped
            }
        };

        // Only reschedule while still running.
        if self.driver.is_running() {
            self.host.request_frame();
        }

        outcome
    }

    /// Apply a new host size immediately.
    pub fn resize(&mut self, width: u32, height: u32) -> ResizeOutcome {
        if self.torn_down {
            debug!("ignoring resize after teardown");
            return ResizeOutcome::Rejected;
        }

        self.viewport.resize(&mut self.backend, width, height)
    }

    fn poll_model_load(&mut self) {
        let Some(pending) = self.pending_model.as_mut() else {
            return;
        };

        if let Some(result) = pending.poll() {
            self.pending_model = None;
            self.complete_model_load(result);
        }
    }

    /// Integrate a finished model load into the scene.
    ///
    /// Only the first successful completion attaches a model, later ones are
    /// ignored with a warning. A failure leaves the slot empty and the scene
    /// keeps rendering without it.
    pub fn complete_model_load(&mut self, result: LoadResult) {
        if self.torn_down {
            debug!("scene is torn down, discarding model load result");
            return;
        }

        match result {
            Ok(model) => self.attach_model(model),
            Err(e) => {
                if let ModelSlot::Attached(_) = self.scene.model_slot() {
                    warn!("ignoring model load failure after a model was attached: {e}");
                } else {
                    error!("failed to load model, continuing without it: {e}");
                    self.scene.mark_model_failed();
                    self.model_load_error = Some(e);
                }
            }
        }
    }

    fn attach_model(&mut self, model: ModelData) {
        if let ModelSlot::Attached(_) = self.scene.model_slot() {
            warn!("model {:?} arrived after the slot was filled, ignoring it", model.name);
            return;
        }

        let instance = match self.upload_model(&model) {
            Ok(instance) => instance,
            Err(e) => {
                error!("failed to upload model {:?}, continuing without it: {e}", model.name);
                self.scene.mark_model_failed();
                return;
            }
        };

        let mut transform = self.model_transform;
        transform.translation.y = self.driver.motion().bob_height(self.driver.clock().phase());

        match self
            .scene
            .attach_model(RenderableNode::model(transform, instance))
        {
            Ok(_) => info!("model {:?} attached to the scene", model.name),
            Err(rejected) => self.release_payload(&rejected.payload),
        }
    }

    /// Upload every primitive of `model`. On failure anything already uploaded
    /// is released again.
    fn upload_model(&mut self, model: &ModelData) -> Result<ModelInstance, RenderError> {
        let mut parts = Vec::with_capacity(model.primitives.len());

        for primitive in &model.primitives {
            match self.upload_mesh(&primitive.mesh, &primitive.material) {
                Ok(mesh) => parts.push(ModelPart {
                    mesh,
                    local_transform: primitive.local_transform,
                }),
                Err(e) => {
                    for part in &parts {
                        self.release_mesh(part.mesh);
                    }
                    return Err(e);
                }
            }
        }

        Ok(ModelInstance {
            name: model.name.clone(),
            parts,
        })
    }

    /// Upload a mesh and its material as a pair. Neither is kept if the other
    /// fails.
    fn upload_mesh(
        &mut self,
        mesh: &MeshData,
        material: &MaterialData,
    ) -> Result<MeshInstance, RenderError> {
        let geometry = self.backend.create_geometry(mesh)?;

        match self.backend.create_material(material) {
            Ok(material) => Ok(MeshInstance { geometry, material }),
            Err(e) => {
                self.release_geometry_logged(geometry);
                Err(e)
            }
        }
    }

    fn release_payload(&mut self, payload: &NodePayload) {
        for mesh in payload.meshes() {
            self.release_mesh(mesh);
        }
    }

    fn release_mesh(&mut self, mesh: MeshInstance) {
        self.release_geometry_logged(mesh.geometry);

        if let Err(e) = self.backend.release_material(mesh.material) {
            warn!("{e}");
        }
    }

    fn release_geometry_logged(&mut self, geometry: GeometryKey) {
        if let Err(e) = self.backend.release_geometry(geometry) {
            warn!("{e}");
        }
    }

    /// Stop the scene and release everything it holds. Safe to call more than
    /// once, later calls do nothing.
    ///
    /// Teardown order is the animation loop, resize notifications, the model
    /// payload and the other nodes, the surface and finally the renderer
    /// context. An outstanding model load is abandoned and its result
    /// discarded when it arrives.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }

        info!("tearing down scene");
        self.torn_down = true;

        self.driver.stop();

        if self.resize_subscribed {
            self.host.unsubscribe_resize();
            self.resize_subscribed = false;
        }

        // Dropping the receiver lets an in flight load see that the scene is
        // gone.
        if self.pending_model.take().is_some() {
            debug!("abandoning outstanding model load");
        }

        for node in self.scene.drain_nodes() {
            debug!("releasing scene node {}", node.name);
            self.release_payload(&node.payload);
        }

        if self.surface_attached {
            self.backend.detach_surface();
            self.host.detach_surface();
            self.surface_attached = false;
        }

        let outstanding = self.backend.outstanding_resources();
        if !outstanding.is_empty() {
            warn!("GPU resources still alive after releasing the scene: {outstanding:?}");
        }

        self.backend.dispose();
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn driver_state(&self) -> DriverState {
        self.driver.state()
    }

    /// Frames that were drawn. Skipped frames are not counted.
    pub fn frames_produced(&self) -> u64 {
        self.driver.frames_produced()
    }

    /// Why the model never arrived, if its load failed.
    pub fn model_load_error(&self) -> Option<&LoadError> {
        self.model_load_error.as_ref()
    }

    pub fn outstanding_resources(&self) -> OutstandingResources {
        self.backend.outstanding_resources()
    }

    pub fn is_model_load_outstanding(&self) -> bool {
        self.pending_model
            .as_ref()
            .is_some_and(PendingModel::is_outstanding)
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn viewport(&self) -> &ViewportManager {
        &self.viewport
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<H: ViewportHost, B: RenderBackend> Drop for SceneLifecycle<H, B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
