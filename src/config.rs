//! Assistant configuration.
//!
//! Settings come from the environment by default; an optional TOML file can
//! override model and endpoint settings. API keys for individual tools are
//! optional — a tool with a missing key reports a terminal "not configured"
//! failure at call time instead of blocking startup.

use std::path::Path;

use serde::Deserialize;

use crate::errors::ConfigError;

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub openai_api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Per-call HTTP timeout, applied to LLM and tool requests alike.
    pub request_timeout_secs: u64,
    pub github_token: Option<String>,
    pub openweather_api_key: Option<String>,
    pub news_api_key: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            github_token: None,
            openweather_api_key: None,
            news_api_key: None,
        }
    }
}

impl AssistantConfig {
    /// Build a configuration from environment variables alone.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load a TOML file, then let environment variables override it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&raw)?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.model = model;
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            self.github_token = Some(token);
        }
        if let Ok(key) = std::env::var("OPENWEATHER_API_KEY") {
            self.openweather_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("NEWS_API_KEY") {
            self.news_api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AssistantConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.request_timeout_secs, 10);
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        let parsed: AssistantConfig = toml::from_str(
            r#"
            model = "gpt-4o-mini"
            request_timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(parsed.model, "gpt-4o-mini");
        assert_eq!(parsed.request_timeout_secs, 30);
        assert_eq!(parsed.base_url, "https://api.openai.com/v1");
    }
}
