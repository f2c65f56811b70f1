//! Chat configuration
//!
//! Sources, lowest to highest priority:
//! 1. built-in defaults
//! 2. `config.yaml` in the config directory (`$KICHAT_CONFIG_DIR`, else `~/.kichat`)
//! 3. `KICHAT_*` environment variables
//!
//! Command-line flags are applied on top by the caller.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ChatError, ChatResult};
use crate::network::TimeoutConfig;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3.1:free";
pub const DEFAULT_REFERER: &str = "http://localhost";
pub const DEFAULT_TITLE: &str = "Kichat";

const ENV_CONFIG_DIR: &str = "KICHAT_CONFIG_DIR";
const ENV_API_KEY: &str = "KICHAT_API_KEY";
const ENV_BASE_URL: &str = "KICHAT_BASE_URL";
const ENV_MODEL: &str = "KICHAT_MODEL";
const ENV_REFERER: &str = "KICHAT_REFERER";
const ENV_TITLE: &str = "KICHAT_TITLE";

/// Completion endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Sent as `HTTP-Referer`
    pub referer: String,
    /// Sent as `X-Title`
    pub title: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl ProviderConfig {
    /// `{base_url}/chat/completions`
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// The API key, or a config error when none is set
    pub fn require_api_key(&self) -> ChatResult<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ChatError::config(format!(
                    "missing API key (set provider.api_key or {})",
                    ENV_API_KEY
                ))
            })
    }
}

/// Conversation behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Characters of the first message kept in a new chat's title
    pub title_max_chars: usize,
    pub chat_list_limit: usize,
    pub message_list_limit: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            title_max_chars: 50,
            chat_list_limit: 100,
            message_list_limit: 1000,
        }
    }
}

/// Local chat store settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file; defaults to `kichat.db` in the config directory
    pub database_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| config_dir().join("kichat.db"))
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub provider: ProviderConfig,
    pub timeouts: TimeoutConfig,
    pub chat: ChatSettings,
    pub store: StoreConfig,
}

/// Configuration directory
pub fn config_dir() -> PathBuf {
    std::env::var(ENV_CONFIG_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".kichat"))
}

impl ChatConfig {
    /// Load from `path` (or the default location), then apply the environment
    pub fn load(path: Option<&Path>) -> ChatResult<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config_dir().join(CONFIG_FILE_NAME));

        let mut config = if path.exists() {
            debug!("loading config from {:?}", path);
            Self::from_file(&path)?
        } else {
            debug!("no config at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a YAML config file; absent keys keep their defaults
    pub fn from_file(path: &Path) -> ChatResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ChatError::config(format!("cannot read {:?}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> ChatResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ChatError::config(format!("invalid YAML: {}", e)))
    }

    /// Override provider settings from `KICHAT_*` variables
    pub fn apply_env(&mut self) {
        if let Some(key) = env_value(ENV_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = env_value(ENV_BASE_URL) {
            self.provider.base_url = url;
        }
        if let Some(model) = env_value(ENV_MODEL) {
            self.provider.model = model;
        }
        if let Some(referer) = env_value(ENV_REFERER) {
            self.provider.referer = referer;
        }
        if let Some(title) = env_value(ENV_TITLE) {
            self.provider.title = title;
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
