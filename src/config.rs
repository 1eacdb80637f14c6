//! Configuration management for the outfitcast application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::OutfitError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable holding the weatherapi.com key
pub const WEATHER_API_KEY_VAR: &str = "WEATHER_API_KEY";

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_VAR: &str = "OUTFITCAST_CONFIG";

/// Root configuration structure for the outfitcast application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutfitConfig {
    /// Weather API configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Geocoding (city autocomplete) configuration
    #[serde(default)]
    pub geo: GeoConfig,
    /// Language model configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web front end configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Weather API key, falls back to `WEATHER_API_KEY`
    pub api_key: Option<String>,
    /// Forecast endpoint
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Geocoding API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Cities search endpoint
    #[serde(default = "default_geo_base_url")]
    pub base_url: String,
    /// Country filter passed as `countryIds`
    #[serde(default = "default_geo_country_ids")]
    pub country_ids: String,
    /// Maximum number of suggestions
    #[serde(default = "default_geo_limit")]
    pub limit: u32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// How long suggestions are memoized, 0 disables it
    #[serde(default = "default_geo_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Hugging Face model repository
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Repository revision
    #[serde(default = "default_model_revision")]
    pub revision: String,
    /// Directory holding the model files, bypasses the hub when set
    pub local_dir: Option<String>,
    /// Try an accelerator before falling back to the CPU
    #[serde(default = "default_prefer_gpu")]
    pub prefer_gpu: bool,
    /// Upper bound of generated tokens per recommendation
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Nucleus sampling threshold
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// Penalty applied to tokens already present in the context
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    /// Fixed sampling seed, random when absent
    pub seed: Option<u64>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Web server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Bind address
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Directory with the static front end
    #[serde(default = "default_web_static_dir")]
    pub static_dir: String,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.weatherapi.com/v1/forecast.json".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_geo_base_url() -> String {
    "http://geodb-free-service.wirefreethought.com/v1/geo/cities".to_string()
}

fn default_geo_country_ids() -> String {
    "BR".to_string()
}

fn default_geo_limit() -> u32 {
    5
}

fn default_geo_cache_ttl() -> u64 {
    600
}

fn default_model_id() -> String {
    "Qwen/Qwen2.5-1.5B-Instruct".to_string()
}

fn default_model_revision() -> String {
    "main".to_string()
}

fn default_prefer_gpu() -> bool {
    true
}

fn default_max_new_tokens() -> usize {
    250
}

fn default_temperature() -> f64 {
    0.2
}

fn default_top_p() -> f64 {
    0.8
}

fn default_repetition_penalty() -> f32 {
    1.3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_web_static_dir() -> String {
    "static".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            base_url: default_geo_base_url(),
            country_ids: default_geo_country_ids(),
            limit: default_geo_limit(),
            timeout_seconds: default_timeout(),
            cache_ttl_seconds: default_geo_cache_ttl(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            revision: default_model_revision(),
            local_dir: None,
            prefer_gpu: default_prefer_gpu(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            repetition_penalty: default_repetition_penalty(),
            seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            static_dir: default_web_static_dir(),
        }
    }
}

impl WeatherConfig {
    /// Key sent to the weather API; an empty key surfaces as the provider's auth failure
    #[must_use]
    pub fn resolved_api_key(&self) -> String {
        self.api_key
            .clone()
            .or_else(|| env::var(WEATHER_API_KEY_VAR).ok())
            .unwrap_or_default()
    }
}

impl OutfitConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from))
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("outfitcast.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // OUTFITCAST_WEB__PORT=8080 -> web.port
        builder = builder.add_source(
            Environment::with_prefix("OUTFITCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: OutfitConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("outfitcast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_timeout();
        }
        if self.geo.base_url.is_empty() {
            self.geo.base_url = default_geo_base_url();
        }
        if self.geo.country_ids.is_empty() {
            self.geo.country_ids = default_geo_country_ids();
        }
        if self.geo.limit == 0 {
            self.geo.limit = default_geo_limit();
        }
        if self.geo.timeout_seconds == 0 {
            self.geo.timeout_seconds = default_timeout();
        }
        if self.model.model_id.is_empty() {
            self.model.model_id = default_model_id();
        }
        if self.model.revision.is_empty() {
            self.model.revision = default_model_revision();
        }
        if self.model.max_new_tokens == 0 {
            self.model.max_new_tokens = default_max_new_tokens();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.web.port == 0 {
            self.web.port = default_web_port();
        }
        if self.web.static_dir.is_empty() {
            self.web.static_dir = default_web_static_dir();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        // A missing key is allowed; the weather API reports it as a Failure
        if let Some(api_key) = &self.weather.api_key {
            if api_key.trim().is_empty() {
                return Err(OutfitError::config(
                    "Weather API key cannot be empty if provided. \
                     Either remove it or provide a valid key.",
                )
                .into());
            }

            if api_key.len() > 100 {
                return Err(OutfitError::config(
                    "Weather API key appears to be invalid (too long). Please check your API key."
                ).into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(OutfitError::config("Weather API timeout cannot exceed 300 seconds").into());
        }

        if self.geo.timeout_seconds > 300 {
            return Err(
                OutfitError::config("Geocoding API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.geo.limit > 10 {
            return Err(OutfitError::config("Geocoding suggestion limit cannot exceed 10").into());
        }

        if self.model.max_new_tokens > 4096 {
            return Err(OutfitError::config("Model max_new_tokens cannot exceed 4096").into());
        }

        if self.model.temperature <= 0.0 || self.model.temperature > 2.0 {
            return Err(OutfitError::config("Model temperature must be in (0, 2]").into());
        }

        if self.model.top_p <= 0.0 || self.model.top_p > 1.0 {
            return Err(OutfitError::config("Model top_p must be in (0, 1]").into());
        }

        if self.model.repetition_penalty < 1.0 {
            return Err(OutfitError::config("Model repetition_penalty cannot be below 1.0").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(OutfitError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(OutfitError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Weather API", &self.weather.base_url),
            ("Geocoding API", &self.geo.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(OutfitError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = OutfitConfig::default();
        assert_eq!(config.weather.base_url, "https://api.weatherapi.com/v1/forecast.json");
        assert_eq!(config.weather.timeout_seconds, 30);
        assert_eq!(config.geo.limit, 5);
        assert_eq!(config.geo.country_ids, "BR");
        assert_eq!(config.model.model_id, "Qwen/Qwen2.5-1.5B-Instruct");
        assert_eq!(config.model.max_new_tokens, 250);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.web.port, 8000);
        assert!(config.weather.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_api_key() {
        let mut config = OutfitConfig::default();
        config.weather.api_key = Some("   ".to_string());
        assert!(config.validate_api_keys().is_err());
    }

    #[test]
    fn test_configured_api_key_wins() {
        let mut config = OutfitConfig::default();
        config.weather.api_key = Some("configured_key".to_string());
        assert_eq!(config.weather.resolved_api_key(), "configured_key");
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = OutfitConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = OutfitConfig::default();
        config.weather.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_sampling() {
        let mut config = OutfitConfig::default();
        config.model.top_p = 1.5;
        assert!(config.validate().is_err());

        let mut config = OutfitConfig::default();
        config.model.repetition_penalty = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_non_http_url() {
        let mut config = OutfitConfig::default();
        config.geo.base_url = "ftp://example.com".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Geocoding API"));
    }

    #[test]
    fn test_apply_defaults_fills_zero_values() {
        let mut config = OutfitConfig::default();
        config.geo.limit = 0;
        config.web.port = 0;
        config.logging.format = String::new();
        config.apply_defaults();
        assert_eq!(config.geo.limit, 5);
        assert_eq!(config.web.port, 8000);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[geo]\nlimit = 3\n\n\
             [model]\nmax_new_tokens = 120\nprefer_gpu = false\n\n\
             [web]\nport = 9090"
        )
        .unwrap();

        let config = OutfitConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.geo.limit, 3);
        assert_eq!(config.model.max_new_tokens, 120);
        assert!(!config.model.prefer_gpu);
        assert_eq!(config.web.port, 9090);
        // untouched sections keep their defaults
        assert_eq!(config.model.top_p, 0.8);
        assert_eq!(config.geo.country_ids, "BR");
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = OutfitConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("outfitcast"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
