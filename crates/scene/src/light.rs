use glam::Vec3;
use serde::{Deserialize, Serialize};
use stagehand_common::Color;

/// Kind of light source. Spot angles are full cone angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Point,
    Directional,
    Spot { inner: f32, outer: f32 },
}

impl LightKind {
    pub fn label(&self) -> &'static str {
        match self {
            LightKind::Point => "point",
            LightKind::Directional => "directional",
            LightKind::Spot { .. } => "spot",
        }
    }
}

/// A light in the scene. Position is ignored by directional lights and
/// direction by point lights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
    pub diffuse: Color,
    pub specular: Color,
    pub position: Vec3,
    direction: Vec3,
    pub visible: bool,
}

impl Light {
    pub fn new(name: impl Into<String>, kind: LightKind) -> Self {
        Self {
            name: name.into(),
            kind,
            diffuse: Color::WHITE,
            specular: Color::WHITE,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            visible: true,
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Set the direction; stored normalized. A zero vector is ignored.
    pub fn set_direction(&mut self, direction: Vec3) {
        if let Some(d) = direction.try_normalize() {
            self.direction = d;
        }
    }

    pub fn set_colour(&mut self, colour: Color) {
        self.diffuse = colour;
        self.specular = colour;
    }

    /// Set the spot cone angles, in radians. No-op on other kinds.
    pub fn set_spot_range(&mut self, inner: f32, outer: f32) {
        if let LightKind::Spot { .. } = self.kind {
            self.kind = LightKind::Spot { inner, outer };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_light_is_visible_white() {
        let l = Light::new("L", LightKind::Point);
        assert!(l.visible);
        assert_eq!(l.diffuse, Color::WHITE);
    }

    #[test]
    fn direction_is_normalized() {
        let mut l = Light::new("L", LightKind::Directional);
        l.set_direction(Vec3::new(0.0, -2.0, 2.0));
        assert!((l.direction().length() - 1.0).abs() < 1e-6);
        l.set_direction(Vec3::ZERO);
        assert!((l.direction().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn spot_range_only_on_spots() {
        let mut p = Light::new("P", LightKind::Point);
        p.set_spot_range(0.1, 0.2);
        assert_eq!(p.kind, LightKind::Point);

        let mut s = Light::new("S", LightKind::Spot { inner: 0.0, outer: 0.0 });
        s.set_spot_range(0.1, 0.2);
        assert_eq!(s.kind, LightKind::Spot { inner: 0.1, outer: 0.2 });
    }
}
