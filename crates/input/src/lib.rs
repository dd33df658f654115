//! Unbuffered keyboard/mouse reactions for the stage.
//!
//! Each frame the [`FrameController`] reads an [`InputState`] snapshot and
//! produces [`Action`]s, which are applied to a [`ControlTarget`]:
//!
//! - I/K move along local -Z/+Z, U/O along +Y/-Y, J/L along -X/+X;
//! - O is ignored while the node is at or below the floor height;
//! - J/L with left shift held turn the node instead;
//! - a left press toggles the light once per press;
//! - the right button toggles it at most once per cooldown.
//!
//! # Invariants
//! - The cooldown timer never goes below zero.
//! - Targets are addressed by handle, never by name.

pub mod action;
pub mod controller;
pub mod state;
pub mod target;

pub use action::Action;
pub use controller::FrameController;
pub use state::{InputState, Key, MouseButton};
pub use target::{ControlTarget, SceneBinding};

pub fn crate_info() -> &'static str {
    "stagehand-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_assets::MaterialLibrary;
    use stagehand_scene::build_stage;

    #[test]
    fn controller_drives_the_stage() {
        let mut stage = build_stage(MaterialLibrary::with_builtins(), 800, 600).unwrap();
        let h = stage.handles;
        let mut controller = FrameController::default();

        let forward = InputState::holding(&[Key::I], &[]);
        let click = InputState::holding(&[], &[MouseButton::Left]);
        {
            let mut target = SceneBinding::new(&mut stage.scene, h.entity_node, h.spotlight);
            controller.frame(&forward, 0.5, &mut target).unwrap();
            controller.frame(&click, 0.016, &mut target).unwrap();
        }

        let p = stage.scene.node_position(h.entity_node).unwrap();
        assert!((p.z - -125.0).abs() < 1e-3);
        assert!(!stage.scene.is_light_visible(h.spotlight).unwrap());
    }
}
