//! Configuration types for rolechat.
//!
//! Settings live in a small JSON file; the API key is read from the
//! environment (or a `.env` file) and is never written to the config.

use crate::chat::DEFAULT_GREETING;
use crate::preset::RolePreset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["OPENAI_API_KEY", "VITE_ChatGPT_API_KEY"];

/// Main configuration for rolechat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the completion API (without `/chat/completions`).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for a single completion request.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Greeting shown as the first assistant message.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Preset active at startup.
    #[serde(default)]
    pub default_preset: RolePreset,
}

fn default_model() -> String {
    "gpt-4-1106-preview".into()
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_request_timeout_seconds() -> u64 {
    60
}

fn default_greeting() -> String {
    DEFAULT_GREETING.into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base_url: default_api_base_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            greeting: default_greeting(),
            default_preset: RolePreset::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    /// Write a default configuration, refusing to overwrite an existing file.
    pub fn init(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Default location: `<config_dir>/rolechat/config.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("rolechat").join("config.json"))
    }

    /// Override the startup preset by name.
    pub fn set_default_preset(&mut self, name: &str) -> Result<(), ConfigError> {
        self.default_preset =
            RolePreset::from_name(name).ok_or_else(|| ConfigError::UnknownPreset(name.into()))?;
        Ok(())
    }
}

/// Bearer token for the completion service.
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank values.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Read the key from the process environment after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the key through `lookup`, trying each of [`API_KEY_VARS`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find_map(|value| Self::new(value).ok())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// The raw secret, for the authorization header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading or writing config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing config JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Error serializing config to JSON.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// No API key in the environment.
    #[error("No API key found: set OPENAI_API_KEY (or VITE_ChatGPT_API_KEY) in the environment or a .env file")]
    MissingApiKey,

    /// Preset name not in the enumerated list.
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    /// Platform has no config directory.
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// Refused to overwrite an existing config.
    #[error("Config already exists at {}", .0.display())]
    AlreadyExists(PathBuf),
}
