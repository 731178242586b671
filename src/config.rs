use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_base_url: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub request_timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            primary_model: "gemini-2.5-pro".to_string(),
            fallback_model: "gemini-2.5-flash".to_string(),
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub supported_domain: String,
    pub settings_db: String,
    pub user_agent: String,
    pub gemini: GeminiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supported_domain: "amazon.in".to_string(),
            settings_db: "settings.db".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ProductLens/0.1".to_string(),
            gemini: GeminiConfig::default(),
        }
    }
}

/// Loads the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("Config {} not found, using defaults", path);
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_string(),
                source,
            });
        }
    };
    parse_config(&content).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

fn parse_config(content: &str) -> Result<AppConfig, serde_json::Error> {
    serde_json::from_str(content)
}
