//! Configuration resolution for cxr-dash
//!
//! Every setting resolves with **ENV → TOML → compiled default** priority.
//! The resolved [`DashboardConfig`] is built once at startup and handed to the
//! classifier and explanation clients; nothing reads the environment at call time.

use cxr_common::config::{env_value, TomlConfig};
use cxr_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::services::prompt::DEFAULT_PROMPT_TEMPLATE;

/// Environment variable naming the TOML file
pub const CONFIG_PATH_ENV: &str = "CXR_CONFIG";
/// TOML file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "cxr-dash.toml";

pub const CLASSIFIER_URL_ENV: &str = "CLASSIFIER_URL";
pub const API_KEY_ENV: &str = "API_KEY";
pub const FALLBACK_POLICY_ENV: &str = "CXR_FALLBACK_POLICY";
pub const BIND_ADDRESS_ENV: &str = "CXR_BIND_ADDRESS";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5730";
pub const DEFAULT_CLASSIFIER_URL: &str = "http://localhost:5000";
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_SIMULATION_DELAY_MS: u64 = 1_500;
pub const DEFAULT_EXPLANATION_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_EXPLANATION_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_EXPLANATION_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_EXPLANATION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// What the classifier client does when the classification service fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Substitute a locally simulated, flagged result
    #[default]
    Simulate,
    /// Fail the run with guidance to check the classification service
    Surface,
}

impl FallbackPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackPolicy::Simulate => "simulate",
            FallbackPolicy::Surface => "surface",
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulate" => Ok(FallbackPolicy::Simulate),
            "surface" => Ok(FallbackPolicy::Surface),
            other => Err(Error::Config(format!(
                "Unknown fallback policy '{}' (expected 'simulate' or 'surface')",
                other
            ))),
        }
    }
}

/// Classification service settings
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Base URL; requests go to `{base_url}/predict`
    pub base_url: String,
    pub timeout: Duration,
    pub fallback_policy: FallbackPolicy,
    /// Simulated processing time before a fallback result is returned
    pub simulation_delay: Duration,
}

impl ClassifierConfig {
    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url.trim_end_matches('/'))
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CLASSIFIER_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_CLASSIFIER_TIMEOUT_MS),
            fallback_policy: FallbackPolicy::default(),
            simulation_delay: Duration::from_millis(DEFAULT_SIMULATION_DELAY_MS),
        }
    }
}

/// Generative explanation service settings
#[derive(Clone)]
pub struct ExplanationConfig {
    pub base_url: String,
    /// `None` means every report falls back to the error text
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub prompt_template: String,
}

impl ExplanationConfig {
    pub fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

// Keeps the credential out of logs
impl fmt::Debug for ExplanationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplanationConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EXPLANATION_URL.to_string(),
            api_key: None,
            model: DEFAULT_EXPLANATION_MODEL.to_string(),
            temperature: DEFAULT_EXPLANATION_TEMPERATURE,
            timeout: Duration::from_millis(DEFAULT_EXPLANATION_TIMEOUT_MS),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

/// Upload limits
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub max_upload_bytes: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Fully resolved dashboard configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub bind_address: String,
    pub classifier: ClassifierConfig,
    pub explanation: ExplanationConfig,
    pub intake: IntakeConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            classifier: ClassifierConfig::default(),
            explanation: ExplanationConfig::default(),
            intake: IntakeConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Resolve from environment, then the TOML file, then compiled defaults
    pub fn resolve(toml: &TomlConfig) -> Result<Self> {
        let defaults = DashboardConfig::default();

        let bind_address = env_value(BIND_ADDRESS_ENV)
            .or_else(|| toml.bind_address.clone())
            .unwrap_or(defaults.bind_address);

        let classifier_url = env_value(CLASSIFIER_URL_ENV)
            .or_else(|| toml.classifier.url.clone())
            .unwrap_or(defaults.classifier.base_url);

        let fallback_policy = match env_value(FALLBACK_POLICY_ENV)
            .or_else(|| toml.classifier.fallback_policy.clone())
        {
            Some(value) => value.parse()?,
            None => defaults.classifier.fallback_policy,
        };

        let api_key = resolve_api_key(toml);

        let config = DashboardConfig {
            bind_address,
            classifier: ClassifierConfig {
                base_url: classifier_url,
                timeout: toml
                    .classifier
                    .timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.classifier.timeout),
                fallback_policy,
                simulation_delay: toml
                    .classifier
                    .simulation_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.classifier.simulation_delay),
            },
            explanation: ExplanationConfig {
                base_url: toml
                    .explanation
                    .url
                    .clone()
                    .unwrap_or(defaults.explanation.base_url),
                api_key,
                model: toml
                    .explanation
                    .model
                    .clone()
                    .unwrap_or(defaults.explanation.model),
                temperature: toml
                    .explanation
                    .temperature
                    .unwrap_or(defaults.explanation.temperature),
                timeout: toml
                    .explanation
                    .timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.explanation.timeout),
                prompt_template: toml
                    .explanation
                    .prompt_template
                    .clone()
                    .unwrap_or(defaults.explanation.prompt_template),
            },
            intake: IntakeConfig {
                max_upload_bytes: toml
                    .intake
                    .max_upload_bytes
                    .unwrap_or(defaults.intake.max_upload_bytes),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the clients cannot work with
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("classifier url", &self.classifier.base_url),
            ("explanation url", &self.explanation.base_url),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", name, url, e)))?;
        }

        if self.classifier.timeout.is_zero() {
            return Err(Error::Config("classifier.timeout_ms must be > 0".to_string()));
        }
        if self.explanation.timeout.is_zero() {
            return Err(Error::Config("explanation.timeout_ms must be > 0".to_string()));
        }
        if !(0.0..=2.0).contains(&self.explanation.temperature) {
            return Err(Error::Config(format!(
                "explanation.temperature must be within 0.0-2.0, got {}",
                self.explanation.temperature
            )));
        }
        if self.explanation.model.trim().is_empty() {
            return Err(Error::Config("explanation.model must not be empty".to_string()));
        }
        if self.intake.max_upload_bytes == 0 {
            return Err(Error::Config("intake.max_upload_bytes must be > 0".to_string()));
        }

        Ok(())
    }
}

/// Resolve the explanation-service credential
///
/// **Priority:** ENV → TOML. Absence is allowed; reports then degrade to the
/// fallback text.
fn resolve_api_key(toml: &TomlConfig) -> Option<String> {
    let env_key = env_value(API_KEY_ENV);
    let toml_key = toml
        .explanation
        .api_key
        .as_ref()
        .filter(|k| is_valid_key(k))
        .cloned();

    if env_key.is_some() && toml_key.is_some() {
        warn!("API key found in both environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Explanation API key loaded from environment variable");
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!("Explanation API key loaded from TOML config");
        return Some(key);
    }

    warn!(
        "Explanation API key not configured (set {} or explanation.api_key); \
         reports will use the fallback text",
        API_KEY_ENV
    );
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
