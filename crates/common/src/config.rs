use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Application configuration. Every field has a default, so an empty file
/// (or no file at all) reproduces the stock stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowSettings,
    pub controls: ControlSettings,
    pub camera: CameraSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Stagehand".into(),
            width: 1280,
            height: 720,
        }
    }
}

/// Tuning for the per-frame entity controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Units per second along each held axis.
    pub move_speed: f32,
    /// Yaw applied per frame with shift held is five times this, in degrees.
    pub rotate_step_degrees: f32,
    /// Seconds between right-button light toggles.
    pub toggle_cooldown: f32,
    /// Node height at or below which downward movement is cancelled.
    pub min_height: f32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            move_speed: 250.0,
            rotate_step_degrees: 0.13,
            toggle_cooldown: 0.5,
            min_height: 25.0,
        }
    }
}

/// Tuning for the free-look camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub top_speed: f32,
    pub fast_multiplier: f32,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            top_speed: 150.0,
            fast_multiplier: 20.0,
            sensitivity: 0.0025,
        }
    }
}

impl AppConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid("window size must be non-zero".into()));
        }
        if self.controls.toggle_cooldown < 0.0 {
            return Err(ConfigError::Invalid(
                "toggle_cooldown must not be negative".into(),
            ));
        }
        if self.camera.top_speed <= 0.0 {
            return Err(ConfigError::Invalid("camera top_speed must be positive".into()));
        }
        Ok(())
    }
}
