use glam::Vec3;
use stagehand_common::Color;
use stagehand_scene::{Camera, LightKind, Scene, Viewport};
use std::fmt::Write;

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub background: Color,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 10.0, 10.0),
            forward: Vec3::NEG_Z,
            fov_degrees: 45.0,
            background: Color::BLACK,
        }
    }
}

impl RenderView {
    /// View through `camera` into `viewport`.
    pub fn from_camera(camera: &Camera, viewport: &Viewport) -> Self {
        Self {
            eye: camera.position,
            forward: camera.forward(),
            fov_degrees: camera.fov_y.to_degrees(),
            background: viewport.background,
        }
    }
}

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads scene state and a view configuration, then produces
/// output. It never mutates the scene.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame from the given scene and view.
    fn render(&self, scene: &Scene, view: &RenderView) -> Self::Output;
}

/// Produces a human-readable description of the scene.
///
/// Used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, scene: &Scene, view: &RenderView) -> String {
        let mut out = String::new();
        let a = scene.ambient();
        let _ = writeln!(
            out,
            "=== Scene (ambient=({:.2}, {:.2}, {:.2}), shadows={:?}) ===",
            a.r,
            a.g,
            a.b,
            scene.shadow_technique()
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) dir=({:.2}, {:.2}, {:.2}) fov={:.0}",
            view.eye.x,
            view.eye.y,
            view.eye.z,
            view.forward.x,
            view.forward.y,
            view.forward.z,
            view.fov_degrees
        );

        let _ = writeln!(out, "Nodes: {}", scene.node_count());
        for (id, node) in scene.nodes() {
            let p = node.transform.position;
            let name = node.name.as_deref().unwrap_or("-");
            let _ = writeln!(
                out,
                "  node {} [{}] pos=({:.2}, {:.2}, {:.2}) entities={}",
                id.0,
                name,
                p.x,
                p.y,
                p.z,
                node.entities.len()
            );
        }

        for (id, entity) in scene.entities() {
            let _ = writeln!(
                out,
                "  entity {} [{}] material={} shadows={}",
                id.0,
                entity.name.as_deref().unwrap_or("-"),
                entity.material.as_deref().unwrap_or("-"),
                if entity.cast_shadows { "on" } else { "off" }
            );
        }

        for (_, light) in scene.lights() {
            let d = light.diffuse;
            let _ = write!(
                out,
                "  light {} ({}) {} diffuse=({:.2}, {:.2}, {:.2})",
                light.name,
                light.kind.label(),
                if light.visible { "on" } else { "off" },
                d.r,
                d.g,
                d.b
            );
            if !matches!(light.kind, LightKind::Directional) {
                let p = light.position;
                let _ = write!(out, " pos=({:.1}, {:.1}, {:.1})", p.x, p.y, p.z);
            }
            out.push('\n');
        }

        out
    }
}
