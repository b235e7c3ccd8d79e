//! Engine configuration.
//!
//! Every field has a default, so an empty YAML document or an empty
//! environment yields a usable configuration (minus the API key).
//!
//! # Environment Variables
//!
//! - `TOOLSMITH_MODEL`: model identifier (default: `llama3-8b-8192`)
//! - `TOOLSMITH_API_BASE`: OpenAI-compatible base URL (default: Groq)
//! - `TOOLSMITH_API_KEY`: API key; falls back to `GROQ_API_KEY`
//! - `TOOLSMITH_PLANNER_TEMPERATURE`, `TOOLSMITH_SYNTHESIS_TEMPERATURE`
//! - `TOOLSMITH_MAX_TOKENS`, `TOOLSMITH_TIMEOUT_SECS`
//! - `TOOLSMITH_PLANNER_FALLBACK`: `calculator` or `no_capability`

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::planner::PlannerFallback;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An environment variable held a value of the wrong shape.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model identifier passed to the completion endpoint.
    pub model: String,
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// API key for the completion endpoint.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Temperature for the capability-listing prompt.
    pub planner_temperature: f64,
    /// Temperature for the capability-construction prompt.
    pub synthesis_temperature: f64,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Retries on rate-limit and server errors.
    pub max_retries: u32,
    /// Whole-request timeout for completion calls.
    pub request_timeout_secs: u64,
    /// Per-request timeout for synthesized HTTP capabilities.
    pub http_timeout_secs: u64,
    /// What the planner returns when the LLM names nothing usable.
    pub fallback: PlannerFallback,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "llama3-8b-8192".to_string(),
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            planner_temperature: 0.7,
            synthesis_temperature: 0.7,
            max_tokens: 2048,
            max_retries: 2,
            request_timeout_secs: 120,
            http_timeout_secs: 30,
            fallback: PlannerFallback::Calculator,
        }
    }
}

impl EngineConfig {
    /// Parse from a YAML string; missing keys take defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse from a YAML file on disk.
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Defaults overridden by `TOOLSMITH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("TOOLSMITH_MODEL") {
            self.model = model;
        }
        if let Some(base) = get("TOOLSMITH_API_BASE") {
            self.api_base = base;
        }
        if let Some(key) = get("TOOLSMITH_API_KEY").or_else(|| get("GROQ_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(v) = get("TOOLSMITH_PLANNER_TEMPERATURE") {
            self.planner_temperature = parse_value("TOOLSMITH_PLANNER_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("TOOLSMITH_SYNTHESIS_TEMPERATURE") {
            self.synthesis_temperature = parse_value("TOOLSMITH_SYNTHESIS_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("TOOLSMITH_MAX_TOKENS") {
            self.max_tokens = parse_value("TOOLSMITH_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("TOOLSMITH_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_value("TOOLSMITH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("TOOLSMITH_PLANNER_FALLBACK") {
            self.fallback = parse_value("TOOLSMITH_PLANNER_FALLBACK", &v)?;
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
