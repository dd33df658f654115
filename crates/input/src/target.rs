use glam::Vec3;
use stagehand_common::{LightId, NodeId, TransformSpace};
use stagehand_scene::{Scene, SceneError};

/// What the frame controller drives: one node and one light.
pub trait ControlTarget {
    type Error;

    /// Parent-relative height of the controlled node.
    fn height(&self) -> Result<f32, Self::Error>;

    fn translate_local(&mut self, delta: Vec3) -> Result<(), Self::Error>;

    fn yaw(&mut self, radians: f32) -> Result<(), Self::Error>;

    /// Flip the light. Returns its new visibility.
    fn toggle_light(&mut self) -> Result<bool, Self::Error>;
}

/// Binds a scene node and light to the controller by handle.
pub struct SceneBinding<'a> {
    pub scene: &'a mut Scene,
    pub node: NodeId,
    pub light: LightId,
}

impl<'a> SceneBinding<'a> {
    pub fn new(scene: &'a mut Scene, node: NodeId, light: LightId) -> Self {
        Self { scene, node, light }
    }
}

impl ControlTarget for SceneBinding<'_> {
    type Error = SceneError;

    fn height(&self) -> Result<f32, SceneError> {
        Ok(self.scene.node_position(self.node)?.y)
    }

    fn translate_local(&mut self, delta: Vec3) -> Result<(), SceneError> {
        self.scene.translate(self.node, delta, TransformSpace::Local)
    }

    fn yaw(&mut self, radians: f32) -> Result<(), SceneError> {
        self.scene.yaw(self.node, radians)
    }

    fn toggle_light(&mut self) -> Result<bool, SceneError> {
        self.scene.toggle_light(self.light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_scene::LightKind;

    #[test]
    fn binding_drives_scene() {
        let mut scene = Scene::new();
        let node = scene.create_child_node(Scene::ROOT, None).unwrap();
        let light = scene.create_light("SpotLight", LightKind::Point).unwrap();
        scene.set_position(node, Vec3::new(0.0, 25.0, 0.0)).unwrap();

        let mut b = SceneBinding::new(&mut scene, node, light);
        assert_eq!(b.height().unwrap(), 25.0);
        b.translate_local(Vec3::new(0.0, 5.0, 0.0)).unwrap();
        assert_eq!(b.height().unwrap(), 30.0);
        assert!(!b.toggle_light().unwrap());
        b.yaw(0.5).unwrap();

        assert!(!scene.is_light_visible(light).unwrap());
    }

    #[test]
    fn binding_reports_bad_handles() {
        let mut scene = Scene::new();
        let mut b = SceneBinding::new(&mut scene, NodeId(9), LightId(9));
        assert!(matches!(b.height(), Err(SceneError::InvalidNode(_))));
        assert!(matches!(b.toggle_light(), Err(SceneError::InvalidLight(_))));
    }
}
