//! Application configuration

pub mod client;
pub mod prompts;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use client::WidgetConfig;
pub use prompts::builtin as prompts_builtin;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory holding the selection database
    pub data_dir: PathBuf,
    pub widget: WidgetConfig,
}

impl Config {
    /// Read the environment, layering it over the optional `WIDGET_CONFIG` file
    pub fn from_env() -> anyhow::Result<Self> {
        let mut widget = match env::var("WIDGET_CONFIG") {
            Ok(path) => WidgetConfig::from_file(&PathBuf::from(path))?,
            Err(_) => WidgetConfig::default(),
        };

        if let Ok(source) = env::var("CATALOG_SOURCE") {
            widget.catalog.source = source;
        }
        if let Ok(endpoint) = env::var("CHAT_ENDPOINT") {
            widget.chat.endpoint = endpoint;
        }
        widget.validate()?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            data_dir: env::var("ROUTINE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            widget,
        })
    }
}
