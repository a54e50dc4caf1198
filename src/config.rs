use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

pub const APP_ID: &str = "gemini-chat";
pub const APP_NAME: &str = "Gemini Chat";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

const ENV_PREFIX: &str = "GEMINI_CHAT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom path for the local SQLite store. Defaults to
    /// `<data_dir>/gemini-chat/gemini-chat.db`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl AppConfig {
    /// Layer defaults, the config file and `GEMINI_CHAT__*` environment
    /// variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(global) = global_config_path() {
                    builder = builder.add_source(File::from(global).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let config = builder.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(PathBuf::from(path));
        }
        let data_dir = dirs::data_dir().context("Could not determine the data directory")?;
        Ok(data_dir.join(APP_ID).join(format!("{}.db", APP_ID)))
    }
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_ID).join("config.toml"))
}
