use glam::{EulerRot, Mat4, Quat, Vec3};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, warn};

use crate::{
    camera::Camera,
    lighting::Light,
    renderer::{DrawItem, FogSettings, FrameDescription, GeometryKey, MaterialKey},
};

new_key_type! {
    /// Identifies a node owned by a `SceneGraph`.
    pub struct NodeKey;
}

/// Position, rotation and scale of a node in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians, applied in X, Y, Z order.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            Quat::from_euler(
                EulerRot::XYZ,
                self.rotation.x,
                self.rotation.y,
                self.rotation.z,
            ),
            self.translation,
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A geometry and material pair uploaded to the render backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshInstance {
    pub geometry: GeometryKey,
    pub material: MaterialKey,
}

/// One uploaded primitive of a loaded model.
#[derive(Clone, Copy, Debug)]
pub struct ModelPart {
    pub mesh: MeshInstance,
    /// Transform from the part to the model root.
    pub local_transform: Mat4,
}

/// A loaded model whose primitives have been uploaded to the render backend.
#[derive(Clone, Debug)]
pub struct ModelInstance {
    pub name: String,
    pub parts: Vec<ModelPart>,
}

/// What a node contributes to the scene.
#[derive(Clone, Debug)]
pub enum NodePayload {
    Light(Light),
    Mesh(MeshInstance),
    Model(ModelInstance),
}

impl NodePayload {
    /// Every backend resource referenced by this payload.
    pub fn meshes(&self) -> Vec<MeshInstance> {
        match self {
            NodePayload::Light(_) => Vec::new(),
            NodePayload::Mesh(mesh) => vec![*mesh],
            NodePayload::Model(model) => model.parts.iter().map(|p| p.mesh).collect(),
        }
    }
}

/// A transform plus a payload.
#[derive(Clone, Debug)]
pub struct RenderableNode {
    pub name: String,
    pub transform: Transform,
    pub payload: NodePayload,
}

impl RenderableNode {
    /// A light node. Point lights are placed at their own position.
    pub fn light(name: impl Into<String>, light: Light) -> Self {
        let translation = match &light {
            Light::Point(point) => point.position,
            Light::Ambient(_) => Vec3::ZERO,
        };

        Self {
            name: name.into(),
            transform: Transform::from_translation(translation),
            payload: NodePayload::Light(light),
        }
    }

    pub fn mesh(name: impl Into<String>, transform: Transform, mesh: MeshInstance) -> Self {
        Self {
            name: name.into(),
            transform,
            payload: NodePayload::Mesh(mesh),
        }
    }

    pub fn model(transform: Transform, model: ModelInstance) -> Self {
        Self {
            name: model.name.clone(),
            transform,
            payload: NodePayload::Model(model),
        }
    }
}

/// State of the asynchronously filled model slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelSlot {
    /// The load has not finished yet.
    Pending,
    /// The load failed, the scene carries on without a model.
    Failed,
    Attached(NodeKey),
    /// The scene was torn down.
    Released,
}

impl ModelSlot {
    pub fn is_empty(&self) -> bool {
        !matches!(self, ModelSlot::Attached(_))
    }
}

/// Owns every node in the scene along with global attributes such as fog.
///
/// Nodes are traversed in insertion order.
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, RenderableNode>,
    order: Vec<NodeKey>,
    model_slot: ModelSlot,
    pub clear_color: Vec3,
    pub fog: FogSettings,
}

impl SceneGraph {
    pub fn new(clear_color: Vec3, fog: FogSettings) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            order: Vec::new(),
            model_slot: ModelSlot::Pending,
            clear_color,
            fog,
        }
    }

    pub fn add_node(&mut self, node: RenderableNode) -> NodeKey {
        debug!("adding scene node {}", node.name);

        let key = self.nodes.insert(node);
        self.order.push(key);
        key
    }

    /// Fill the model slot.
    ///
    /// The slot can only be filled once. A second attach leaves the scene
    /// untouched and hands the node back so the caller can release it.
    pub fn attach_model(&mut self, node: RenderableNode) -> Result<NodeKey, RenderableNode> {
        if let ModelSlot::Attached(_) = self.model_slot {
            warn!("model slot is already filled, ignoring {}", node.name);
            return Err(node);
        }

        let key = self.add_node(node);
        self.model_slot = ModelSlot::Attached(key);
        Ok(key)
    }

    /// Record that the model will never arrive. Has no effect once a model is
    /// attached.
    pub fn mark_model_failed(&mut self) {
        if self.model_slot == ModelSlot::Pending {
            self.model_slot = ModelSlot::Failed;
        }
    }

    pub fn model_slot(&self) -> ModelSlot {
        self.model_slot
    }

    pub fn model(&self) -> Option<&RenderableNode> {
        match self.model_slot {
            ModelSlot::Attached(key) => self.nodes.get(key),
            _ => None,
        }
    }

    pub fn model_mut(&mut self) -> Option<&mut RenderableNode> {
        match self.model_slot {
            ModelSlot::Attached(key) => self.nodes.get_mut(key),
            _ => None,
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &RenderableNode)> {
        self.order
            .iter()
            .filter_map(|key| self.nodes.get(*key).map(|node| (*key, node)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove every node, most recently added first, so the model payload goes
    /// before the static nodes it was added after.
    pub fn drain_nodes(&mut self) -> Vec<RenderableNode> {
        self.model_slot = ModelSlot::Released;

        self.order
            .drain(..)
            .rev()
            .filter_map(|key| self.nodes.remove(key))
            .collect()
    }

    /// Flatten the scene into what the backend needs to draw one frame.
    pub fn frame_description(&self, camera: &Camera) -> FrameDescription {
        let mut frame = FrameDescription {
            clear_color: self.clear_color,
            fog: self.fog,
            view_projection: camera.view_projection_matrix(),
            eye: camera.eye(),
            ambient: Vec3::ZERO,
            point_lights: Vec::new(),
            draws: Vec::new(),
        };

        for (_, node) in self.nodes() {
            match &node.payload {
                NodePayload::Light(Light::Ambient(ambient)) => frame.ambient += ambient.radiance(),
                NodePayload::Light(Light::Point(point)) => {
                    let mut point = *point;
                    point.position = node.transform.translation;
                    frame.point_lights.push(point);
                }
                NodePayload::Mesh(mesh) => frame.draws.push(DrawItem {
                    geometry: mesh.geometry,
                    material: mesh.material,
                    local_to_world: node.transform.to_matrix(),
                }),
                NodePayload::Model(model) => {
                    let model_to_world = node.transform.to_matrix();

                    frame.draws.extend(model.parts.iter().map(|part| DrawItem {
                        geometry: part.mesh.geometry,
                        material: part.mesh.material,
                        local_to_world: model_to_world * part.local_transform,
                    }));
                }
            }
        }

        frame
    }
}

#[cfg(test)]
mod tests {
    use slotmap::KeyData;

    use super::*;
    use crate::lighting::{AmbientLight, PointLight};

    fn mesh_instance(id: u64) -> MeshInstance {
        MeshInstance {
            geometry: GeometryKey::from(KeyData::from_ffi(id)),
            material: MaterialKey::from(KeyData::from_ffi(id)),
        }
    }

    fn model_node(name: &str) -> RenderableNode {
        RenderableNode::model(
            Transform::IDENTITY,
            ModelInstance {
                name: name.to_string(),
                parts: vec![ModelPart {
                    mesh: mesh_instance(7),
                    local_transform: Mat4::from_translation(Vec3::Y),
                }],
            },
        )
    }

    fn camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            Vec3::Y,
            1.0,
            0.1,
            100.0,
            800,
            600,
        )
    }

    fn scene() -> SceneGraph {
        SceneGraph::new(
            Vec3::ZERO,
            FogSettings {
                color: Vec3::ONE,
                density: 0.1,
            },
        )
    }

    #[test]
    fn traversal_follows_insertion_order() {
        let mut scene = scene();
        let names = ["c", "a", "b"];

        for (i, name) in names.iter().enumerate() {
            scene.add_node(RenderableNode::mesh(
                *name,
                Transform::IDENTITY,
                mesh_instance(i as u64 + 1),
            ));
        }

        let visited: Vec<_> = scene.nodes().map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(names.to_vec(), visited);
    }

    #[test]
    fn model_slot_is_filled_once() {
        let mut scene = scene();
        assert_eq!(ModelSlot::Pending, scene.model_slot());
        assert!(scene.model().is_none());

        let key = scene.attach_model(model_node("first")).unwrap();
        let rejected = scene.attach_model(model_node("second")).unwrap_err();

        assert_eq!("second", rejected.name);
        assert_eq!(ModelSlot::Attached(key), scene.model_slot());
        assert_eq!("first", scene.model().unwrap().name);
        assert_eq!(1, scene.len());
    }

    #[test]
    fn failure_does_not_clear_an_attached_model() {
        let mut failed = scene();
        failed.mark_model_failed();
        assert_eq!(ModelSlot::Failed, failed.model_slot());

        let mut loaded = scene();
        loaded.attach_model(model_node("jelly")).unwrap();
        loaded.mark_model_failed();
        assert!(!loaded.model_slot().is_empty());
    }

    #[test]
    fn frame_description_collects_lights_and_draws() {
        let mut scene = scene();
        scene.add_node(RenderableNode::light(
            "ambient",
            Light::Ambient(AmbientLight {
                color: Vec3::ONE,
                intensity: 0.5,
            }),
        ));
        scene.add_node(RenderableNode::light(
            "point",
            Light::Point(PointLight {
                position: Vec3::new(0.0, 10.0, 0.0),
                color: Vec3::ONE,
                intensity: 1.0,
                range: 100.0,
                decay: 2.0,
            }),
        ));
        scene.add_node(RenderableNode::mesh(
            "floor",
            Transform::from_translation(Vec3::new(0.0, -5.0, 0.0)),
            mesh_instance(1),
        ));
        let mut model = model_node("jelly");
        model.transform.translation = Vec3::new(2.0, 0.0, 0.0);
        scene.attach_model(model).unwrap();

        let frame = scene.frame_description(&camera());

        assert_eq!(Vec3::splat(0.5), frame.ambient);
        assert_eq!(1, frame.point_lights.len());
        assert_eq!(Vec3::new(0.0, 10.0, 0.0), frame.point_lights[0].position);
        assert_eq!(2, frame.draws.len());
        assert_eq!(
            Mat4::from_translation(Vec3::new(0.0, -5.0, 0.0)),
            frame.draws[0].local_to_world
        );
        assert_eq!(
            Mat4::from_translation(Vec3::new(2.0, 1.0, 0.0)),
            frame.draws[1].local_to_world
        );
    }

    #[test]
    fn drain_removes_model_first() {
        let mut scene = scene();
        scene.add_node(RenderableNode::mesh(
            "floor",
            Transform::IDENTITY,
            mesh_instance(1),
        ));
        scene.attach_model(model_node("jelly")).unwrap();

        let drained: Vec<_> = scene.drain_nodes().into_iter().map(|n| n.name).collect();

        assert_eq!(vec!["jelly".to_string(), "floor".to_string()], drained);
        assert!(scene.is_empty());
        assert!(scene.model().is_none());
        assert_eq!(ModelSlot::Released, scene.model_slot());
    }
}
