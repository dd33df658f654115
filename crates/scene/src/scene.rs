use crate::camera::{Camera, Viewport};
use crate::light::{Light, LightKind};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use stagehand_assets::{AssetError, MeshHandle};
use stagehand_common::{
    CameraId, Color, EntityId, LightId, NodeId, Transform, TransformSpace, ViewportId,
};
use std::collections::BTreeMap;

/// Errors from scene operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("name '{0}' is already in use")]
    DuplicateName(String),
    #[error("scene node '{0}' not found")]
    NodeNotFound(String),
    #[error("light '{0}' not found")]
    LightNotFound(String),
    #[error("camera '{0}' not found")]
    CameraNotFound(String),
    #[error("invalid node {0:?}")]
    InvalidNode(NodeId),
    #[error("invalid entity {0:?}")]
    InvalidEntity(EntityId),
    #[error("invalid light {0:?}")]
    InvalidLight(LightId),
    #[error("invalid camera {0:?}")]
    InvalidCamera(CameraId),
    #[error("invalid viewport {0:?}")]
    InvalidViewport(ViewportId),
    #[error("entity {0:?} is already attached to a node")]
    EntityAlreadyAttached(EntityId),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// How shadows are requested to be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadowTechnique {
    #[default]
    None,
    StencilModulative,
    StencilAdditive,
    TextureModulative,
    TextureAdditive,
}

/// An event record produced by mutations to the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    NodeCreated { id: NodeId, parent: NodeId },
    EntityAttached { entity: EntityId, node: NodeId },
    LightCreated { id: LightId },
    NodeMoved { id: NodeId, old: Vec3, new: Vec3 },
    NodeRotated { id: NodeId, radians: f32 },
    LightVisibility { id: LightId, visible: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: Option<String>,
    pub parent: Option<NodeId>,
    pub transform: Transform,
    pub entities: Vec<EntityId>,
}

/// A mesh instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: Option<String>,
    pub mesh: MeshHandle,
    pub material: Option<String>,
    pub cast_shadows: bool,
    pub node: Option<NodeId>,
}

/// The scene graph.
///
/// Objects live in dense vectors addressed by index handles. Names are
/// optional for nodes and entities and unique per object kind; they are a
/// setup-time convenience, the handles are what callers should hold.
#[derive(Debug, Clone)]
pub struct Scene {
    ambient: Color,
    shadows: ShadowTechnique,
    nodes: Vec<SceneNode>,
    entities: Vec<Entity>,
    lights: Vec<Light>,
    cameras: Vec<Camera>,
    viewports: Vec<Viewport>,
    node_names: BTreeMap<String, NodeId>,
    entity_names: BTreeMap<String, EntityId>,
    light_names: BTreeMap<String, LightId>,
    camera_names: BTreeMap<String, CameraId>,
    event_log: Vec<SceneEvent>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Root node handle; always present.
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            ambient: Color::BLACK,
            shadows: ShadowTechnique::None,
            nodes: vec![SceneNode {
                name: None,
                parent: None,
                transform: Transform::default(),
                entities: Vec::new(),
            }],
            entities: Vec::new(),
            lights: Vec::new(),
            cameras: Vec::new(),
            viewports: Vec::new(),
            node_names: BTreeMap::new(),
            entity_names: BTreeMap::new(),
            light_names: BTreeMap::new(),
            camera_names: BTreeMap::new(),
            event_log: Vec::new(),
        }
    }

    pub fn ambient(&self) -> Color {
        self.ambient
    }

    pub fn set_ambient(&mut self, colour: Color) {
        self.ambient = colour;
    }

    pub fn shadow_technique(&self) -> ShadowTechnique {
        self.shadows
    }

    pub fn set_shadow_technique(&mut self, technique: ShadowTechnique) {
        self.shadows = technique;
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    // --- Nodes ---

    pub fn create_child_node(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, SceneError> {
        self.node(parent)?;
        let id = NodeId(self.nodes.len() as u32);
        if let Some(name) = name {
            claim_name(&mut self.node_names, name, id)?;
        }
        self.nodes.push(SceneNode {
            name: name.map(str::to_string),
            parent: Some(parent),
            transform: Transform::default(),
            entities: Vec::new(),
        });
        self.event_log.push(SceneEvent::NodeCreated { id, parent });
        tracing::debug!("created node {:?} ({:?}) under {:?}", id, name, parent);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(id.index()).ok_or(SceneError::InvalidNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(id.index()).ok_or(SceneError::InvalidNode(id))
    }

    pub fn node_by_name(&self, name: &str) -> Result<NodeId, SceneError> {
        self.node_names
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Position relative to the parent node.
    pub fn node_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.node(id)?.transform.position)
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        let old = node.transform.position;
        node.transform.position = position;
        self.event_log.push(SceneEvent::NodeMoved {
            id,
            old,
            new: position,
        });
        Ok(())
    }

    pub fn translate(
        &mut self,
        id: NodeId,
        delta: Vec3,
        space: TransformSpace,
    ) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        let old = node.transform.position;
        node.transform.translate(delta, space);
        let new = node.transform.position;
        self.event_log.push(SceneEvent::NodeMoved { id, old, new });
        Ok(())
    }

    /// Rotate about the node's local Y axis.
    pub fn yaw(&mut self, id: NodeId, radians: f32) -> Result<(), SceneError> {
        self.node_mut(id)?.transform.yaw(radians);
        self.event_log.push(SceneEvent::NodeRotated { id, radians });
        Ok(())
    }

    /// Transform of a node composed through all of its ancestors.
    pub fn world_transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        let node = self.node(id)?;
        match node.parent {
            Some(parent) => Ok(self.world_transform(parent)?.then(&node.transform)),
            None => Ok(node.transform),
        }
    }

    // --- Entities ---

    pub fn create_entity(
        &mut self,
        name: Option<&str>,
        mesh: MeshHandle,
    ) -> Result<EntityId, SceneError> {
        let id = EntityId(self.entities.len() as u32);
        if let Some(name) = name {
            claim_name(&mut self.entity_names, name, id)?;
        }
        self.entities.push(Entity {
            name: name.map(str::to_string),
            mesh,
            material: None,
            cast_shadows: true,
            node: None,
        });
        Ok(id)
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity, SceneError> {
        self.entities
            .get(id.index())
            .ok_or(SceneError::InvalidEntity(id))
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, SceneError> {
        self.entities
            .get_mut(id.index())
            .ok_or(SceneError::InvalidEntity(id))
    }

    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.entity_names.get(name).copied()
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i as u32), e))
    }

    /// Attach an entity to a node. An entity can hang off one node only.
    pub fn attach(&mut self, node: NodeId, entity: EntityId) -> Result<(), SceneError> {
        self.node(node)?;
        let e = self.entity_mut(entity)?;
        if e.node.is_some() {
            return Err(SceneError::EntityAlreadyAttached(entity));
        }
        e.node = Some(node);
        self.node_mut(node)?.entities.push(entity);
        self.event_log.push(SceneEvent::EntityAttached { entity, node });
        Ok(())
    }

    // --- Lights ---

    pub fn create_light(&mut self, name: &str, kind: LightKind) -> Result<LightId, SceneError> {
        let id = LightId(self.lights.len() as u32);
        claim_name(&mut self.light_names, name, id)?;
        self.lights.push(Light::new(name, kind));
        self.event_log.push(SceneEvent::LightCreated { id });
        tracing::debug!("created {} light '{}'", kind.label(), name);
        Ok(id)
    }

    pub fn light(&self, id: LightId) -> Result<&Light, SceneError> {
        self.lights.get(id.index()).ok_or(SceneError::InvalidLight(id))
    }

    pub fn light_mut(&mut self, id: LightId) -> Result<&mut Light, SceneError> {
        self.lights
            .get_mut(id.index())
            .ok_or(SceneError::InvalidLight(id))
    }

    pub fn light_by_name(&self, name: &str) -> Result<LightId, SceneError> {
        self.light_names
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::LightNotFound(name.to_string()))
    }

    pub fn lights(&self) -> impl Iterator<Item = (LightId, &Light)> {
        self.lights
            .iter()
            .enumerate()
            .map(|(i, l)| (LightId(i as u32), l))
    }

    pub fn is_light_visible(&self, id: LightId) -> Result<bool, SceneError> {
        Ok(self.light(id)?.visible)
    }

    pub fn set_light_visible(&mut self, id: LightId, visible: bool) -> Result<(), SceneError> {
        self.light_mut(id)?.visible = visible;
        self.event_log.push(SceneEvent::LightVisibility { id, visible });
        Ok(())
    }

    /// Flip a light's visibility. Returns the new state.
    pub fn toggle_light(&mut self, id: LightId) -> Result<bool, SceneError> {
        let visible = !self.is_light_visible(id)?;
        self.set_light_visible(id, visible)?;
        tracing::debug!("light {:?} is now {}", id, if visible { "on" } else { "off" });
        Ok(visible)
    }

    // --- Cameras and viewports ---

    pub fn create_camera(&mut self, name: &str) -> Result<CameraId, SceneError> {
        let id = CameraId(self.cameras.len() as u32);
        claim_name(&mut self.camera_names, name, id)?;
        self.cameras.push(Camera::new(name));
        Ok(id)
    }

    pub fn camera(&self, id: CameraId) -> Result<&Camera, SceneError> {
        self.cameras
            .get(id.index())
            .ok_or(SceneError::InvalidCamera(id))
    }

    pub fn camera_mut(&mut self, id: CameraId) -> Result<&mut Camera, SceneError> {
        self.cameras
            .get_mut(id.index())
            .ok_or(SceneError::InvalidCamera(id))
    }

    pub fn camera_by_name(&self, name: &str) -> Result<CameraId, SceneError> {
        self.camera_names
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::CameraNotFound(name.to_string()))
    }

    /// Add a viewport showing `camera`, sized `width` x `height` pixels.
    pub fn add_viewport(
        &mut self,
        camera: CameraId,
        width: u32,
        height: u32,
    ) -> Result<ViewportId, SceneError> {
        self.camera(camera)?;
        let id = ViewportId(self.viewports.len() as u32);
        self.viewports.push(Viewport {
            camera,
            background: Color::BLACK,
            actual_width: width,
            actual_height: height,
        });
        Ok(id)
    }

    pub fn viewport(&self, id: ViewportId) -> Result<&Viewport, SceneError> {
        self.viewports
            .get(id.index())
            .ok_or(SceneError::InvalidViewport(id))
    }

    pub fn viewport_mut(&mut self, id: ViewportId) -> Result<&mut Viewport, SceneError> {
        self.viewports
            .get_mut(id.index())
            .ok_or(SceneError::InvalidViewport(id))
    }

    /// Resize a viewport and match its camera's aspect ratio.
    pub fn resize_viewport(
        &mut self,
        id: ViewportId,
        width: u32,
        height: u32,
    ) -> Result<(), SceneError> {
        let vp = self.viewport_mut(id)?;
        vp.actual_width = width;
        vp.actual_height = height;
        let aspect = vp.aspect_ratio();
        let camera = vp.camera;
        self.camera_mut(camera)?.aspect = aspect;
        Ok(())
    }
}

fn claim_name<Id: Copy>(
    names: &mut BTreeMap<String, Id>,
    name: &str,
    id: Id,
) -> Result<(), SceneError> {
    if names.contains_key(name) {
        return Err(SceneError::DuplicateName(name.to_string()));
    }
    names.insert(name.to_string(), id);
    Ok(())
}
