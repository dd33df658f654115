use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

macro_rules! index_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

index_handle!(
    /// Handle to a node in the scene graph.
    NodeId
);
index_handle!(
    /// Handle to a renderable mesh instance.
    EntityId
);
index_handle!(
    /// Handle to a light source.
    LightId
);
index_handle!(CameraId);
index_handle!(ViewportId);

/// Space in which a translation is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransformSpace {
    /// Along the node's own axes.
    #[default]
    Local,
    /// Along the parent's axes.
    Parent,
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Move by `delta`. In local space the delta is rotated by the current
    /// orientation first.
    pub fn translate(&mut self, delta: Vec3, space: TransformSpace) {
        match space {
            TransformSpace::Local => self.position += self.rotation * delta,
            TransformSpace::Parent => self.position += delta,
        }
    }

    /// Rotate about the local Y axis.
    pub fn yaw(&mut self, radians: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_y(radians)).normalize();
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Compose a child transform under `self`.
    pub fn then(&self, child: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale * child.position),
            rotation: (self.rotation * child.rotation).normalize(),
            scale: self.scale * child.scale,
        }
    }
}

/// Linear RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn local_translate_follows_orientation() {
        let mut t = Transform::default();
        t.yaw(90.0_f32.to_radians());
        t.translate(Vec3::new(0.0, 0.0, -1.0), TransformSpace::Local);
        // Facing -Z rotated a quarter turn left ends up facing -X.
        assert!(approx(t.position, Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn parent_translate_ignores_orientation() {
        let mut t = Transform::default();
        t.yaw(90.0_f32.to_radians());
        t.translate(Vec3::new(0.0, 0.0, -1.0), TransformSpace::Parent);
        assert!(approx(t.position, Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn yaw_accumulates() {
        let mut a = Transform::default();
        a.yaw(0.25);
        a.yaw(0.25);
        let mut b = Transform::default();
        b.yaw(0.5);
        assert!(a.rotation.abs_diff_eq(b.rotation, 1e-5));
    }

    #[test]
    fn compose_offsets_child() {
        let parent = Transform::from_position(Vec3::new(0.0, 10.0, 0.0));
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let world = parent.then(&child);
        assert!(approx(world.position, Vec3::new(1.0, 10.0, 0.0)));
    }

    #[test]
    fn handles_index() {
        assert_eq!(NodeId(3).index(), 3);
        assert!(LightId(1) < LightId(2));
    }
}
