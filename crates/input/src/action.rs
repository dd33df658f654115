use glam::Vec3;

/// A scene change produced by one frame of input.
///
/// The controller produces actions from raw input; targets consume actions,
/// never raw input. This keeps the reaction logic testable without a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Move the controlled node by a delta in its local space.
    Translate(Vec3),
    /// Rotate the controlled node about its local Y axis, in radians.
    Yaw(f32),
    /// Flip the controlled light's visibility.
    ToggleLight,
}

impl Action {
    pub fn is_toggle(&self) -> bool {
        matches!(self, Action::ToggleLight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_translate_is_constructible() {
        let a = Action::Translate(Vec3::new(1.0, 0.0, 0.0));
        assert!(matches!(a, Action::Translate(_)));
        assert!(!a.is_toggle());
    }

    #[test]
    fn toggle_is_toggle() {
        assert!(Action::ToggleLight.is_toggle());
        assert!(!Action::Yaw(0.1).is_toggle());
    }
}
