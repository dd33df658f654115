//! Scene graph: nodes, mesh entities, lights, cameras and viewports.
//!
//! # Invariants
//! - The root node always exists and is `Scene::ROOT`.
//! - Names are unique per object kind; handles never dangle because
//!   nothing is ever removed.
//! - Mutations after creation are recorded in the event log.

pub mod camera;
pub mod light;
mod scene;
pub mod setup;

pub use camera::{Camera, Viewport};
pub use light::{Light, LightKind};
pub use scene::{Entity, Scene, SceneError, SceneEvent, SceneNode, ShadowTechnique};
pub use setup::{Stage, StageHandles, build_stage};

pub fn crate_info() -> &'static str {
    "stagehand-scene v0.1.0"
}
