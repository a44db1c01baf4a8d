//! Layered configuration: defaults, an optional TOML file, then
//! `CAR_PRICE_<SECTION>__<KEY>` environment variables.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::regressor::ModelFormat;

pub const CONFIG_PATH_VAR: &str = "CAR_PRICE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Worker count; actix picks one per core when unset.
    pub workers: Option<usize>,
    /// Maximum accepted JSON body, in bytes.
    pub json_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    pub model_path: PathBuf,
    pub schema_path: PathBuf,
    /// Overrides detection by file extension.
    pub model_format: Option<ModelFormat>,
    /// Load at startup and refuse to start without artifacts.
    pub eager_load: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl AppConfig {
    /// Loads from the file named by `CAR_PRICE_CONFIG`, or
    /// `config/default.toml` when present.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        defaults()?
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("CAR_PRICE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

fn defaults() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("server.json_limit", 4096)?
        .set_default("artifacts.model_path", "artifacts/model.json")?
        .set_default("artifacts.schema_path", "artifacts/feature_columns.json")?
        .set_default("artifacts.eager_load", true)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "pretty")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8000,
                workers: None,
                json_limit: 4096,
            },
            artifacts: ArtifactsConfig {
                model_path: "artifacts/model.json".into(),
                schema_path: "artifacts/feature_columns.json".into(),
                model_format: None,
                eager_load: true,
            },
            logging: LoggingConfig {
                level: "info".into(),
                format: LogFormat::Pretty,
            },
        }
    }
}
