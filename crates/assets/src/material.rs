use crate::AssetError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Surface description used by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Required in JSON; a missing name reads as empty and is rejected.
    #[serde(default)]
    pub name: String,
    pub diffuse: [f32; 4],
    pub specular: [f32; 3],
    pub shininess: f32,
    /// Strength of the procedural tile pattern, 0 for a flat surface.
    pub pattern: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "BaseWhite".into(),
            diffuse: [1.0, 1.0, 1.0, 1.0],
            specular: [0.0, 0.0, 0.0],
            shininess: 1.0,
            pattern: 0.0,
        }
    }
}

/// Named materials.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: BTreeMap<String, Material>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library containing the stock materials.
    pub fn with_builtins() -> Self {
        let mut lib = Self::new();
        lib.insert(Material::default());
        lib.insert(Material {
            name: "Examples/Rockwall".into(),
            diffuse: [0.62, 0.58, 0.52, 1.0],
            specular: [0.1, 0.1, 0.1],
            shininess: 8.0,
            pattern: 0.35,
        });
        lib
    }

    /// Insert or replace a material.
    pub fn insert(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn get(&self, name: &str) -> Result<&Material, AssetError> {
        self.materials
            .get(name)
            .ok_or_else(|| AssetError::UnknownMaterial(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Merge materials from a JSON array. Returns how many were read.
    pub fn merge_json(&mut self, json: &str) -> Result<usize, AssetError> {
        let materials: Vec<Material> = serde_json::from_str(json)?;
        // Check the whole batch first so a bad entry merges nothing.
        if let Some(i) = materials.iter().position(|m| m.name.is_empty()) {
            return Err(AssetError::InvalidMaterial(format!("material {i} has no name")));
        }
        let count = materials.len();
        for m in materials {
            self.insert(m);
        }
        Ok(count)
    }

    /// Merge materials from a JSON file.
    pub fn load_json(&mut self, path: impl AsRef<Path>) -> Result<usize, AssetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let count = self.merge_json(&text)?;
        tracing::info!("loaded {} materials from {}", count, path.display());
        Ok(count)
    }

    /// Write all materials as a JSON array.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        let all: Vec<&Material> = self.materials.values().collect();
        serde_json::to_writer_pretty(file, &all)?;
        Ok(())
    }
}
