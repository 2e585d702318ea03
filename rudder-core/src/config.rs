//! Configuration for the synthesis core.
//!
//! `SynthesisConfig` is the typed object every decision module receives as an
//! explicit parameter. `load_config` layers it with `figment`:
//! defaults -> YAML file -> environment (`RUDDER_SYNTHESIS_*`).

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Synthesis configuration, loaded once and read-only for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Master switch for cross-agent synthesis.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum successful agents before synthesis is worth its cost.
    #[serde(default = "default_min_agents")]
    pub min_agents_for_synthesis: usize,
    /// Agent sets that trigger synthesis whenever all of them succeeded.
    #[serde(default = "default_always_combinations")]
    pub always_synthesize_combinations: Vec<Vec<String>>,
    /// Agent sets that never get synthesized when they are exactly the successful set.
    #[serde(default = "default_skip_combinations")]
    pub skip_synthesis_combinations: Vec<Vec<String>>,
    #[serde(default)]
    pub llm: LlmSettings,
    /// Budget for the whole LLM call, including retries.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Results whose model-reported confidence falls below this are rejected.
    #[serde(default = "default_min_confidence")]
    pub min_confidence_score: f64,
    #[serde(default)]
    pub features: SynthesisFeatures,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Model parameters for the synthesis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Override for the provider endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Extra attempts on transient transport errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Named feature toggles. All default to on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisFeatures {
    /// Governs the whole synthesis gate.
    #[serde(default = "default_true")]
    pub cross_agent_synthesis: bool,
    /// Appends domain focus blocks to the synthesis prompt.
    #[serde(default = "default_true")]
    pub domain_focus: bool,
    /// Lets the context compressor append a raw JSON block when summaries are thin.
    #[serde(default = "default_true")]
    pub raw_json_fallback: bool,
    /// Forces synthesis when the ROB safety check fails.
    #[serde(default = "default_true")]
    pub safety_override: bool,
}

/// Confidence thresholds for the classification cascade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_tier1_threshold")]
    pub tier1_threshold: u8,
    #[serde(default = "default_tier2_threshold")]
    pub tier2_threshold: u8,
}

fn default_true() -> bool {
    true
}
fn default_min_agents() -> usize {
    3
}
fn default_always_combinations() -> Vec<Vec<String>> {
    vec![vec!["cii_agent".to_string(), "hull_agent".to_string()]]
}
fn default_skip_combinations() -> Vec<Vec<String>> {
    vec![vec!["route_agent".to_string()]]
}
fn default_timeout_seconds() -> u64 {
    30
}
fn default_min_confidence() -> f64 {
    0.5
}
fn default_model() -> String {
    "claude-haiku-4-5".to_string()
}
fn default_max_tokens() -> usize {
    4000
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_retries() -> u32 {
    1
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    2000
}
fn default_tier1_threshold() -> u8 {
    85
}
fn default_tier2_threshold() -> u8 {
    75
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_agents_for_synthesis: default_min_agents(),
            always_synthesize_combinations: default_always_combinations(),
            skip_synthesis_combinations: default_skip_combinations(),
            llm: LlmSettings::default(),
            timeout_seconds: default_timeout_seconds(),
            min_confidence_score: default_min_confidence(),
            features: SynthesisFeatures::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            base_url: None,
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for SynthesisFeatures {
    fn default() -> Self {
        Self {
            cross_agent_synthesis: true,
            domain_focus: true,
            raw_json_fallback: true,
            safety_override: true,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            tier1_threshold: default_tier1_threshold(),
            tier2_threshold: default_tier2_threshold(),
        }
    }
}

impl SynthesisConfig {
    /// Parse a YAML document into a config, applying field defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges the decision modules rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_agents_for_synthesis == 0 {
            return Err(invalid("min_agents_for_synthesis must be at least 1"));
        }
        if self.timeout_seconds == 0 {
            return Err(invalid("timeout_seconds must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence_score) {
            return Err(invalid("min_confidence_score must be within 0.0..=1.0"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid("llm.temperature must be within 0.0..=2.0"));
        }
        if self.llm.max_tokens == 0 {
            return Err(invalid("llm.max_tokens must be greater than 0"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model must not be empty"));
        }
        if self.classifier.tier1_threshold > 100 || self.classifier.tier2_threshold > 100 {
            return Err(invalid("classifier thresholds must be within 0..=100"));
        }
        let empty_combo = self
            .always_synthesize_combinations
            .iter()
            .chain(&self.skip_synthesis_combinations)
            .any(|combo| combo.is_empty());
        if empty_combo {
            return Err(invalid("agent combinations must name at least one agent"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid {
        message: message.to_string(),
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`RUDDER_SYNTHESIS_LLM__MODEL`, `RUDDER_SYNTHESIS_ENABLED`, ...)
/// 2. The YAML file at `path`, when given and present
/// 3. Built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<SynthesisConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(SynthesisConfig::default()));

    if let Some(path) = path {
        if path.exists() {
            figment = figment.merge(Yaml::file(path));
        } else {
            tracing::warn!(path = %path.display(), "Synthesis config file not found, using defaults");
        }
    }

    figment = figment.merge(Env::prefixed("RUDDER_SYNTHESIS_").split("__"));

    let config: SynthesisConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}
