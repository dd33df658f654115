//! wgpu render backend for stagehand scenes.
//!
//! Draws every attached entity with its material under the scene's visible
//! lights, clearing to the viewport background. Also hosts the free-look
//! camera controller used by the desktop app.
//!
//! # Invariants
//! - The renderer never mutates the scene.
//! - Hidden lights contribute nothing to a frame.

mod camera;
mod gpu;
mod shaders;

pub use camera::{CameraMan, MoveIntent};
pub use gpu::{FrameStats, MAX_LIGHTS, WgpuRenderer};

pub fn crate_info() -> &'static str {
    "stagehand-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render-wgpu"));
    }

    #[test]
    fn shader_declares_entry_points() {
        assert!(shaders::SCENE_SHADER.contains("fn vs_main"));
        assert!(shaders::SCENE_SHADER.contains("fn fs_main"));
        assert!(shaders::SCENE_SHADER.contains(&format!("array<Light, {MAX_LIGHTS}>")));
    }
}
