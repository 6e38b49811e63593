use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub const WEATHER_KEY_ENV: &str = "OPENWEATHER_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5000 }
fn default_weather_url() -> String { "https://api.openweathermap.org/data/2.5".to_string() }
fn default_timeout_s() -> u64 { 10 }
fn default_model_path() -> String { "models/model.json".to_string() }
fn default_column_names_path() -> String { "column_names.json".to_string() }
fn default_albedo() -> f64 { 0.20 }
fn default_db_path() -> String { "database/database.db".to_string() }
fn default_history_limit() -> usize { 10 }

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub weather: WeatherConfig,
    pub model: ModelConfig,
    pub panel: PanelConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self { base_url: default_weather_url(), api_key: None, timeout_s: default_timeout_s() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Trained 246-input model artifact
    #[serde(default = "default_model_path")]
    pub path: String,
    /// Optional six-input estimator used when the main model fails
    #[serde(default)]
    pub fallback_path: Option<String>,
    #[serde(default = "default_column_names_path")]
    pub column_names_path: String,
    /// Location dropped as reference category during training
    #[serde(default)]
    pub baseline_location: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            fallback_path: None,
            column_names_path: default_column_names_path(),
            baseline_location: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    /// Panel tilt from horizontal (deg); defaults to |latitude| capped at 60°
    #[serde(default)]
    pub tilt_deg: Option<f64>,
    /// Panel azimuth from North (deg); defaults to equator-facing
    #[serde(default)]
    pub azimuth_deg: Option<f64>,
    #[serde(default = "default_albedo")]
    pub albedo: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self { tilt_deg: None, azimuth_deg: None, albedo: default_albedo() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path(), history_limit: default_history_limit() }
    }
}

impl Config {
    /// Loads the config file, or defaults when it does not exist. The weather
    /// API key from the environment takes precedence over the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            info!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(std::env::var(WEATHER_KEY_ENV).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn apply_env(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.weather.api_key = Some(key);
        }
    }
}
