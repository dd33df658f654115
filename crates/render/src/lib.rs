//! Rendering adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers cannot mutate the scene.
//! - Render state derives from scene state and a view.

mod renderer;

pub use renderer::{DebugTextRenderer, RenderView, Renderer};

pub fn crate_info() -> &'static str {
    "stagehand-render v0.1.0"
}
