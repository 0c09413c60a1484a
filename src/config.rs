//! Configuration management for moleguide
//!
//! Aggregates the per-component configurations into one TOML-backed file
//! so a host app can tune detection, validation, capture and performance
//! behavior without recompiling.

use crate::autocapture::AutoCaptureConfig;
use crate::detector::DetectionConfig;
use crate::errors::GuidanceError;
use crate::performance::PerformanceConfig;
use crate::preprocess::PreprocessConfig;
use crate::quality::QualityThresholds;
use crate::validation::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MoleguideConfig {
    pub detection: DetectionConfig,
    pub validation: ValidationConfig,
    pub quality: QualityThresholds,
    pub capture: AutoCaptureConfig,
    pub performance: PerformanceConfig,
    pub preprocess: PreprocessConfig,
}

impl MoleguideConfig {
    /// Load configuration from TOML file. A missing file is not an error;
    /// defaults are returned so first launches work without setup.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GuidanceError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| GuidanceError::ConfigFile(format!("Failed to read config file: {}", e)))?;

        let config: MoleguideConfig = toml::from_str(&contents)
            .map_err(|e| GuidanceError::ConfigFile(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GuidanceError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GuidanceError::ConfigFile(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| GuidanceError::ConfigFile(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| GuidanceError::ConfigFile(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("moleguide.toml")
    }

    /// Load from default location, falling back to defaults on any failure
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), GuidanceError> {
        self.detection.validate()?;
        self.validation.validate()?;
        self.quality.validate().map_err(GuidanceError::InvalidConfig)?;
        self.capture.validate()?;
        self.performance
            .validate()
            .map_err(GuidanceError::InvalidConfig)?;
        Ok(())
    }
}
