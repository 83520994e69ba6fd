//! Scene configuration

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::physics::{ControllerParams, DEFAULT_SPAWN};
use crate::terrain::DensityParams;
use crate::voxel::StreamRadii;

/// Everything needed to start a world. Any subset may be given in JSON;
/// missing fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Density field parameters, including the world seed
    pub density: DensityParams,
    /// Streaming window around the observer
    pub radii: StreamRadii,
    /// Character controller tuning
    pub controller: ControllerParams,
    /// Observer start position
    pub spawn_position: Vec3,
    /// Fixed simulation ticks per second
    pub tick_rate: f32,
    /// Iso level for mesh extraction
    pub iso_level: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            density: DensityParams::default(),
            radii: StreamRadii::default(),
            controller: ControllerParams::default(),
            spawn_position: DEFAULT_SPAWN,
            tick_rate: 60.0,
            iso_level: 0.0,
        }
    }
}

impl SceneConfig {
    /// Seconds per fixed tick
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        if !self.radii.is_valid() {
            return Err(Error::Config(format!(
                "unload radii must not be smaller than load radii, and a cylindrical window needs vertical_unload > vertical_load: {:?}",
                self.radii
            )));
        }
        if !(self.tick_rate > 0.0) {
            return Err(Error::Config(format!("tick_rate must be positive, got {}", self.tick_rate)));
        }
        if let Some(problem) = self.controller.check() {
            return Err(Error::Config(problem));
        }
        if self.density.slope_scale <= 0.0 {
            return Err(Error::Config("density.slope_scale must be positive".into()));
        }
        Ok(())
    }

    /// Load from a JSON file and validate
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        log::info!("Loaded scene config from {}", path.display());
        Ok(config)
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}
