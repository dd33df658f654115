use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use stagehand_common::{CameraId, Color};

const PITCH_LIMIT: f32 = 89.0 * std::f32::consts::PI / 180.0;

/// Perspective camera oriented by yaw and pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub name: String,
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec3::ZERO,
            yaw: -90.0_f32.to_radians(),
            pitch: 0.0,
            fov_y: 45.0_f32.to_radians(),
            aspect: 4.0 / 3.0,
            near: 100.0,
            far: 100_000.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Turn to face `target`. Ignored when `target` is the camera position.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.position).try_normalize() else {
            return;
        };
        self.pitch = dir.y.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = dir.z.atan2(dir.x);
    }

    /// Apply yaw and pitch deltas in radians. Pitch is clamped short of
    /// straight up or down.
    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Region of the window rendered from a camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub camera: CameraId,
    pub background: Color,
    pub actual_width: u32,
    pub actual_height: u32,
}

impl Viewport {
    pub fn aspect_ratio(&self) -> f32 {
        self.actual_width.max(1) as f32 / self.actual_height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_faces_target() {
        let mut cam = Camera::new("c");
        cam.position = Vec3::new(0.0, 300.0, 500.0);
        cam.look_at(Vec3::ZERO);
        let expected = (-cam.position).normalize();
        assert!((cam.forward() - expected).length() < 1e-4);
    }

    #[test]
    fn look_at_self_is_noop() {
        let mut cam = Camera::new("c");
        let (yaw, pitch) = (cam.yaw, cam.pitch);
        cam.look_at(Vec3::ZERO);
        assert_eq!((cam.yaw, cam.pitch), (yaw, pitch));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = Camera::new("c");
        cam.rotate(0.0, 10.0);
        assert!(cam.pitch <= PITCH_LIMIT);
        cam.rotate(0.0, -20.0);
        assert!(cam.pitch >= -PITCH_LIMIT);
    }

    #[test]
    fn view_projection_is_finite() {
        let cam = Camera::new("c");
        let vp = cam.view_projection();
        assert!(vp.is_finite());
    }

    #[test]
    fn viewport_aspect() {
        let vp = Viewport {
            camera: CameraId(0),
            background: Color::BLACK,
            actual_width: 1280,
            actual_height: 720,
        };
        assert!((vp.aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
    }
}
