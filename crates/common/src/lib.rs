//! Shared types for the stagehand workspace: index handles, transforms,
//! colours and application configuration.

pub mod config;
mod types;

pub use config::{AppConfig, CameraSettings, ConfigError, ControlSettings, WindowSettings};
pub use types::{
    CameraId, Color, EntityId, LightId, NodeId, Transform, TransformSpace, ViewportId,
};
