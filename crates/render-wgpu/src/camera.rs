use glam::Vec3;
use stagehand_common::CameraSettings;
use stagehand_scene::Camera;

/// Which movement keys are held this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub fast: bool,
}

/// Free-look camera controller.
///
/// Velocity ramps toward the top speed while a direction is held and
/// bleeds off when nothing is held. Camera motion is not part of the
/// scene event log.
#[derive(Debug, Clone)]
pub struct CameraMan {
    settings: CameraSettings,
    velocity: Vec3,
}

impl Default for CameraMan {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

impl CameraMan {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            settings,
            velocity: Vec3::ZERO,
        }
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Stop dead.
    pub fn halt(&mut self) {
        self.velocity = Vec3::ZERO;
    }

    /// Advance the camera by one frame.
    pub fn update(&mut self, camera: &mut Camera, intent: MoveIntent, dt: f32) {
        let forward = camera.forward();
        let right = camera.right();
        let mut accel = Vec3::ZERO;
        if intent.forward {
            accel += forward;
        }
        if intent.back {
            accel -= forward;
        }
        if intent.right {
            accel += right;
        }
        if intent.left {
            accel -= right;
        }
        if intent.up {
            accel += Vec3::Y;
        }
        if intent.down {
            accel -= Vec3::Y;
        }

        let top = if intent.fast {
            self.settings.top_speed * self.settings.fast_multiplier
        } else {
            self.settings.top_speed
        };

        match accel.try_normalize() {
            Some(dir) => self.velocity += dir * top * dt * 10.0,
            None => self.velocity -= self.velocity * (dt * 10.0).min(1.0),
        }

        let too_small = f32::EPSILON;
        if self.velocity.length_squared() > top * top {
            self.velocity = self.velocity.normalize() * top;
        } else if self.velocity.length_squared() < too_small * too_small {
            self.velocity = Vec3::ZERO;
        }

        if self.velocity != Vec3::ZERO {
            camera.position += self.velocity * dt;
        }
    }

    /// Turn the camera by a mouse motion in pixels.
    pub fn look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        camera.rotate(dx * self.settings.sensitivity, -dy * self.settings.sensitivity);
    }
}
