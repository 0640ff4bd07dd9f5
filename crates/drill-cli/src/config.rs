//! Run configuration
//!
//! A run is configured from, in increasing priority: a named preset or a
//! YAML config file, then command line flags.

use drill_report::OutputFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown preset '{}' (expected one of: {})", .0, PRESETS.join(", "))]
    UnknownPreset(String),
}

/// Names accepted by [`RunConfig::preset`]
pub const PRESETS: &[&str] = &["lessons", "phase0", "phase1", "ci"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Catalog files to load
    pub catalogs: Vec<String>,

    /// Also load the embedded lessons
    pub builtin: bool,

    /// Regex the exercise ids must match
    pub filter: Option<String>,

    pub format: OutputFormat,

    /// List passing exercises and run provenance too
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            catalogs: Vec::new(),
            builtin: false,
            filter: None,
            format: OutputFormat::Text,
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Every embedded lesson, text output
    pub fn lessons() -> Self {
        Self {
            builtin: true,
            ..Self::default()
        }
    }

    /// Embedded lessons restricted to one phase
    pub fn phase(phase: u8) -> Self {
        Self {
            builtin: true,
            filter: Some(format!(r"^phase{}\.", phase)),
            ..Self::default()
        }
    }

    /// Machine-readable output for automation
    pub fn ci() -> Self {
        Self {
            builtin: true,
            format: OutputFormat::Json,
            ..Self::default()
        }
    }

    /// Get a preset by name
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "lessons" => Ok(Self::lessons()),
            "phase0" => Ok(Self::phase(0)),
            "phase1" => Ok(Self::phase(1)),
            "ci" => Ok(Self::ci()),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    /// Load config from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load config from a YAML file
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Catalog sources were named, either files or the embedded lessons
    pub fn has_sources(&self) -> bool {
        self.builtin || !self.catalogs.is_empty()
    }
}
