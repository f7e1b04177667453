//! Widget configuration loaded from a TOML file
//!
//! Every section is optional; a missing file section falls back to defaults
//! and environment variables override what the file says.
//!
//! ```toml
//! [catalog]
//! source = "https://shop.example.com/products.json"
//!
//! [chat]
//! endpoint = "https://my-worker.example.workers.dev/"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 60
//!
//! [storage]
//! key = "selectedProducts"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::prompts::PromptsConfig;
use crate::selection::DEFAULT_STORAGE_KEY;

/// Root widget configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub prompts: PromptsConfig,
}

impl WidgetConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: WidgetConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.source.trim().is_empty() {
            return Err(ConfigError::Validation("catalog.source is empty".to_string()));
        }
        if self.chat.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation("chat.endpoint is empty".to_string()));
        }
        if self.storage.key.trim().is_empty() {
            return Err(ConfigError::Validation("storage.key is empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the API key from the environment variable named in the config
    pub fn chat_api_key(&self) -> Option<String> {
        self.chat
            .api_key_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Catalog source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// URL or file path of the products document
    #[serde(default = "default_catalog_source")]
    pub source: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_catalog_source() -> String {
    "products.json".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: default_catalog_source(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Chat endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key, if the endpoint needs one
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Model name forwarded to the endpoint
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_chat_endpoint() -> String {
    "http://localhost:8787/".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            api_key_env: None,
            model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Persisted selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_key")]
    pub key: String,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
