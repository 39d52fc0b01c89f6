//! Configuration management for study-stream
//!
//! Supports configuration via:
//! 1. Config file (~/.config/study-stream/config.toml)
//! 2. Environment variables (STUDY_API_BASE_URL, STUDY_API_TOKEN, STUDY_LOG)
//! 3. CLI arguments (override file/env settings)

use crate::auth::EnvToken;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API settings
    pub api: ApiSettings,

    /// Logging settings
    pub logging: LoggingSettings,
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL, e.g. `https://study.example.com/api`
    pub base_url: String,

    /// Bearer token (can also use the variable named by `token_env`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable read for the token when `token` is unset
    pub token_env: String,

    /// Timeout for non-streaming requests. Streams have no timeout.
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            token: None,
            token_env: EnvToken::DEFAULT_VAR.to_string(),
            request_timeout_secs: 20,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("study-stream")
            .join("config.toml")
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from specific path
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default().with_env_overrides());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("STUDY_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(token) = std::env::var("STUDY_API_TOKEN") {
            if !token.is_empty() {
                self.api.token = Some(token);
            }
        }
        if let Ok(level) = std::env::var("STUDY_LOG") {
            self.logging.level = level;
        }

        self
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path())
    }

    /// Save config to specific path
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                url
            )));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate example config content
    pub fn example() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}

/// Builder for creating Config programmatically
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.api.token = Some(token.into());
        self
    }

    pub fn token_env(mut self, var: impl Into<String>) -> Self {
        self.config.api.token_env = var.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api.request_timeout_secs = secs;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080/api");
        assert_eq!(config.api.token_env, "STUDY_API_TOKEN");
        assert_eq!(config.api.request_timeout_secs, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .base_url("https://study.example.com/api")
            .token("test-token")
            .request_timeout_secs(5)
            .log_level("debug")
            .build();

        assert_eq!(config.api.base_url, "https://study.example.com/api");
        assert_eq!(config.api.token, Some("test-token".to_string()));
        assert_eq!(config.api.request_timeout_secs, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[api]\nbase_url = \"https://x.test/api\"\n").unwrap();
        assert_eq!(config.api.base_url, "https://x.test/api");
        assert_eq!(config.api.request_timeout_secs, 20);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ConfigBuilder::new().base_url("localhost:8080").build();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ConfigBuilder::new().request_timeout_secs(0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_config() {
        let example = Config::example();
        assert!(example.contains("[api]"));
        assert!(example.contains("[logging]"));
        assert!(!example.contains("token ="));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("study-stream-missing").join("config.toml");
        let config = Config::load_from(path).unwrap();
        assert_eq!(config.api.request_timeout_secs, 20);
        assert_eq!(config.api.token_env, "STUDY_API_TOKEN");
    }
}
