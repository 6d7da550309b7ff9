//! Configuration loading, validation, and management for RecallKit.
//!
//! Loads configuration from `~/.recallkit/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use indexmap::IndexMap;
use recallkit_core::memory::MemoryType;
use recallkit_core::phase::{ContextPackingConfig, UniversalPhase};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `memory.path`.
pub const ENV_MEMORY_PATH: &str = "RECALLKIT_MEMORY_PATH";

/// Environment variable overriding `project_id`.
pub const ENV_PROJECT: &str = "RECALLKIT_PROJECT";

/// Known memory backends.
pub const MEMORY_BACKENDS: [&str; 3] = ["file", "in_memory", "none"];

/// The root configuration structure.
///
/// Maps directly to `~/.recallkit/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Project whose memories are queried when none is given explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Memory store configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Per-phase replacements for the bundled packing table, keyed by phase
    /// name. Table order is allocation order.
    #[serde(default)]
    pub packing: IndexMap<String, ContextPackingConfig>,

    /// Step-budget calibration
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Hypothetical-document query augmentation
    #[serde(default)]
    pub hyde: HydeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// `file`, `in_memory` or `none`
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// JSONL file for the `file` backend. Defaults to
    /// `~/.recallkit/memory/memories.jsonl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_memory_backend() -> String {
    "file".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Largest multiplier a calibration factor may apply
    #[serde(default = "default_max_multiplier")]
    pub max_multiplier: f64,

    /// Absolute step ceiling
    #[serde(default = "default_max_steps_ceiling")]
    pub max_steps_ceiling: u32,

    /// Average at most this many of the most recent calibrations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_limit: Option<usize>,

    /// Base step budget when the caller doesn't supply one
    #[serde(default = "default_base_steps")]
    pub default_base_steps: u32,
}

fn default_max_multiplier() -> f64 {
    2.0
}
fn default_max_steps_ceiling() -> u32 {
    2000
}
fn default_base_steps() -> u32 {
    500
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_multiplier: default_max_multiplier(),
            max_steps_ceiling: default_max_steps_ceiling(),
            sample_limit: None,
            default_base_steps: default_base_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydeSettings {
    /// Off unless the host wires in a text generator
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_hyde_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Augment only when a first pass finds fewer results than this
    #[serde(default = "default_min_results")]
    pub min_results: usize,
}

fn default_hyde_max_output_tokens() -> u32 {
    150
}
fn default_embedding_dimensions() -> usize {
    256
}
fn default_min_results() -> usize {
    3
}

impl Default for HydeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_output_tokens: default_hyde_max_output_tokens(),
            embedding_dimensions: default_embedding_dimensions(),
            min_results: default_min_results(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.recallkit/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `RECALLKIT_MEMORY_PATH`
    /// - `RECALLKIT_PROJECT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let config = Self::load_from(&config_path)?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_MEMORY_PATH).filter(|p| !p.is_empty()) {
            self.memory.path = Some(PathBuf::from(path));
        }
        if let Some(project) = lookup(ENV_PROJECT).filter(|p| !p.is_empty()) {
            self.project_id = Some(project);
        }
        self
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".recallkit")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MEMORY_BACKENDS.contains(&self.memory.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "memory.backend must be one of {}, got '{}'",
                MEMORY_BACKENDS.join(", "),
                self.memory.backend
            )));
        }

        for (phase, packing) in &self.packing {
            phase.parse::<UniversalPhase>().map_err(|e| {
                ConfigError::ValidationError(format!("packing.{phase}: {e}"))
            })?;
            validate_allocation(phase, &packing.allocation)?;
        }

        let calibration = &self.calibration;
        if !calibration.max_multiplier.is_finite() || calibration.max_multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "calibration.max_multiplier must be a finite number >= 1.0".into(),
            ));
        }
        if calibration.max_steps_ceiling == 0 {
            return Err(ConfigError::ValidationError(
                "calibration.max_steps_ceiling must be > 0".into(),
            ));
        }
        if calibration.default_base_steps == 0 {
            return Err(ConfigError::ValidationError(
                "calibration.default_base_steps must be > 0".into(),
            ));
        }
        if calibration.sample_limit == Some(0) {
            return Err(ConfigError::ValidationError(
                "calibration.sample_limit must be > 0 when set".into(),
            ));
        }

        if self.hyde.embedding_dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "hyde.embedding_dimensions must be > 0".into(),
            ));
        }
        if self.hyde.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "hyde.max_output_tokens must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Packing config for `phase`: the override if one is configured,
    /// otherwise the bundled default.
    pub fn packing_for(&self, phase: UniversalPhase) -> ContextPackingConfig {
        self.packing
            .iter()
            .find(|(key, _)| key.parse::<UniversalPhase>().ok() == Some(phase))
            .map(|(_, cfg)| cfg.clone())
            .unwrap_or_else(|| phase.default_packing().clone())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn validate_allocation(
    phase: &str,
    allocation: &IndexMap<MemoryType, f64>,
) -> Result<(), ConfigError> {
    for (memory_type, fraction) in allocation {
        if !(*fraction > 0.0 && *fraction <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "packing.{phase}.allocation.{memory_type} must be in (0, 1], got {fraction}"
            )));
        }
    }
    Ok(())
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
