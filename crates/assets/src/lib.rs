//! Procedural meshes and named materials.
//!
//! Meshes are identified by a content-addressed handle derived from their
//! name. The renderer consumes meshes by handle and materials by name.

mod material;
mod mesh;

pub use material::{Material, MaterialLibrary};
pub use mesh::{MeshData, MeshHandle, MeshStore, MeshVertex, PlaneDesc, build_box, build_plane};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("mesh '{0}' is already registered")]
    DuplicateMesh(String),
    #[error("mesh '{0}' not found")]
    UnknownMesh(String),
    #[error("material '{0}' not found")]
    UnknownMaterial(String),
    #[error("invalid material: {0}")]
    InvalidMaterial(String),
    #[error("invalid plane: {0}")]
    InvalidPlane(&'static str),
}

pub fn crate_info() -> &'static str {
    "stagehand-assets v0.1.0"
}
