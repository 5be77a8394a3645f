//! Configuration file model and resolution
//!
//! Every service reads an optional TOML file. Resolution order for the file
//! path:
//! 1. Explicit path from an environment variable (e.g. `CXR_CONFIG`)
//! 2. `<config_dir>/cxr/<file_name>` (e.g. `~/.config/cxr/cxr-dash.toml`)
//!
//! A missing file is not an error: the caller logs a warning and continues
//! with compiled defaults. A file that exists but cannot be parsed is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name under the platform config directory
pub const CONFIG_DIR_NAME: &str = "cxr";

/// Logging section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info", "cxr_dash=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[classifier]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSection {
    /// Base URL of the classification service (without `/predict`)
    pub url: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// "simulate" or "surface"
    pub fallback_policy: Option<String>,
    /// Simulated processing delay in milliseconds
    pub simulation_delay_ms: Option<u64>,
}

/// `[explanation]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplanationSection {
    /// Base URL of the generative-content service
    pub url: Option<String>,
    /// Credential for the generative-content service
    pub api_key: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Report prompt template with `{label}` and `{confidence}` placeholders
    pub prompt_template: Option<String>,
}

/// `[intake]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeSection {
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: Option<usize>,
}

/// TOML configuration file contents
///
/// All fields are optional so that partial files are valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Address the dashboard listens on (e.g. "127.0.0.1:5730")
    pub bind_address: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub explanation: ExplanationSection,
    #[serde(default)]
    pub intake: IntakeSection,
}

/// Resolve the TOML file path for a service
///
/// Returns `None` only when no explicit path is set and the platform has no
/// config directory.
pub fn config_file_path(env_var_name: &str, file_name: &str) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name))
}

/// Load a TOML config file
///
/// Missing file → warning + `TomlConfig::default()`.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}; using environment and compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config file {}", path.display());
    Ok(config)
}

/// Read a non-blank environment variable
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
