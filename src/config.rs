//! Service configuration loaded from `bloodwork.toml`.
//!
//! [`AppConfig`] holds every tunable parameter. Values missing from the file
//! use sensible defaults. The `GROQ_API_KEY` and `GROQ_MODEL` environment
//! variables take precedence over the file.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Groq API key.
    #[serde(default)]
    pub api_key: String,

    /// Backend model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Override for the chat completions URL (testing, proxies).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Port the HTTP API listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the job database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Character budget for extracted report text, to stay within backend
    /// token-per-minute limits.
    #[serde(default = "default_max_report_chars")]
    pub max_report_chars: usize,

    /// Admission limit on concurrently executing pipelines.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Deadline for a single stage invocation, in seconds.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,

    /// Whether an invalid-document verdict from the gate stage stops the
    /// pipeline.
    #[serde(default)]
    pub halt_on_invalid: bool,

    /// Sampling temperature for backend calls.
    #[serde(default)]
    pub temperature: f32,

    /// Token cap for each generated stage output.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "llama3-70b-8192".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_max_report_chars() -> usize {
    20_000
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_stage_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: None,
            port: default_port(),
            data_dir: default_data_dir(),
            max_report_chars: default_max_report_chars(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            stage_timeout_secs: default_stage_timeout_secs(),
            halt_on_invalid: false,
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `bloodwork.toml` in the current directory.
    /// Uses defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("bloodwork.toml"))
    }

    /// Load configuration from an explicit path, then apply environment
    /// variable overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&contents)?
        } else {
            Self::default()
        };

        // Environment takes precedence over the config file.
        if let Ok(key) = std::env::var("GROQ_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }
        if let Ok(model) = std::env::var("GROQ_MODEL")
            && !model.is_empty()
        {
            config.model = model;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.model, "llama3-70b-8192");
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_report_chars, 20_000);
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.stage_timeout_secs, 120);
        assert!(!config.halt_on_invalid);
        assert!(config.api_key.is_empty());
        assert!(config.base_url.is_none());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            api_key = "gsk-test-123"
            max_concurrent_jobs = 8
            halt_on_invalid = true
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key, "gsk-test-123");
        assert_eq!(config.max_concurrent_jobs, 8);
        assert!(config.halt_on_invalid);
        assert_eq!(config.model, "llama3-70b-8192");
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn load_falls_back_to_defaults_for_missing_file() {
        let config = AppConfig::load_from(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(config.port, 8000);
    }
}
