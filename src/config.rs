//! Configuration management for the advisory service
//!
//! Handles loading configuration from a TOML file and environment variables,
//! and provides validation for all configuration settings.

use crate::AdvisorError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the generative backend key
pub const GENAI_KEY_ENV: &str = "GEN_API_KEY";
/// Environment variable holding the weather provider key
pub const WEATHER_KEY_ENV: &str = "API_KEY";
/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "AGRI_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub genai: GenAiConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub artifact: ArtifactConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on the handling time of a single request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    /// Maximum accepted request body (crop images) in MB
    #[serde(default = "default_max_upload")]
    pub max_upload_mb: u32,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

/// Weather provider (WeatherAPI.com) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
}

/// Generative-language backend (Gemini) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenAiConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_genai_base_url")]
    pub base_url: String,
    #[serde(default = "default_genai_model")]
    pub model: String,
    #[serde(default = "default_genai_timeout")]
    pub timeout_seconds: u32,
}

/// Translation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_translation_base_url")]
    pub base_url: String,
    #[serde(default = "default_translation_timeout")]
    pub timeout_seconds: u32,
}

/// Location of the price model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// URL of the JSON price model; there is no default
    #[serde(default)]
    pub remote_reference: String,
    #[serde(default = "default_artifact_local")]
    pub local_path: PathBuf,
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
    /// OTLP/HTTP collector endpoint; span export is disabled when unset
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_request_timeout() -> u32 {
    60
}

fn default_max_upload() -> u32 {
    10
}

fn default_weather_base_url() -> String {
    "http://api.weatherapi.com/v1".to_string()
}

fn default_weather_timeout() -> u32 {
    30
}

fn default_genai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_genai_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_genai_timeout() -> u32 {
    60
}

fn default_translation_base_url() -> String {
    "https://translate.googleapis.com".to_string()
}

fn default_translation_timeout() -> u32 {
    15
}

fn default_artifact_local() -> PathBuf {
    PathBuf::from("model.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            max_upload_mb: default_max_upload(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_seconds: default_weather_timeout(),
        }
    }
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_genai_base_url(),
            model: default_genai_model(),
            timeout_seconds: default_genai_timeout(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: default_translation_base_url(),
            timeout_seconds: default_translation_timeout(),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            remote_reference: String::new(),
            local_path: default_artifact_local(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.into())
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb as usize * 1024 * 1024
    }
}

impl AdvisorConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("config.toml"));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // AGRI__SECTION__KEY overrides
        builder = builder.add_source(
            Environment::with_prefix("AGRI")
                .separator("__")
                .try_parsing(true),
        );

        // Plain variable names used by existing deployments
        builder = builder
            .set_override_option("genai.api_key", std::env::var(GENAI_KEY_ENV).ok())
            .with_context(|| format!("Failed to apply {GENAI_KEY_ENV}"))?
            .set_override_option("weather.api_key", std::env::var(WEATHER_KEY_ENV).ok())
            .with_context(|| format!("Failed to apply {WEATHER_KEY_ENV}"))?;

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AdvisorConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.genai.base_url.is_empty() {
            self.genai.base_url = default_genai_base_url();
        }
        if self.genai.model.is_empty() {
            self.genai.model = default_genai_model();
        }
        if self.translation.base_url.is_empty() {
            self.translation.base_url = default_translation_base_url();
        }
        if self.artifact.local_path.as_os_str().is_empty() {
            self.artifact.local_path = default_artifact_local();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_artifact()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_tls()?;
        Ok(())
    }

    /// Both paid backends need a credential before the service can start
    pub fn validate_api_keys(&self) -> Result<()> {
        let present = |key: &Option<String>| key.as_deref().is_some_and(|k| !k.trim().is_empty());

        if !present(&self.genai.api_key) || !present(&self.weather.api_key) {
            return Err(AdvisorError::config(format!(
                "API keys not found! Set {GENAI_KEY_ENV} and {WEATHER_KEY_ENV}."
            ))
            .into());
        }

        Ok(())
    }

    fn validate_artifact(&self) -> Result<()> {
        if self.artifact.remote_reference.trim().is_empty() {
            return Err(AdvisorError::config(
                "artifact.remote_reference is required (URL of the JSON price model)",
            )
            .into());
        }
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AdvisorError::config("Server port cannot be 0").into());
        }

        let timeouts = [
            ("server.request_timeout_seconds", self.server.request_timeout_seconds),
            ("weather.timeout_seconds", self.weather.timeout_seconds),
            ("genai.timeout_seconds", self.genai.timeout_seconds),
            ("translation.timeout_seconds", self.translation.timeout_seconds),
        ];
        for (name, value) in timeouts {
            if value == 0 || value > 300 {
                return Err(AdvisorError::config(format!(
                    "{name} must be between 1 and 300 seconds, got {value}"
                ))
                .into());
            }
        }

        if self.server.max_upload_mb == 0 || self.server.max_upload_mb > 100 {
            return Err(
                AdvisorError::config("server.max_upload_mb must be between 1 and 100").into(),
            );
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AdvisorError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AdvisorError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("weather.base_url", self.weather.base_url.as_str()),
            ("genai.base_url", self.genai.base_url.as_str()),
            ("translation.base_url", self.translation.base_url.as_str()),
            ("artifact.remote_reference", self.artifact.remote_reference.as_str()),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AdvisorError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    fn validate_tls(&self) -> Result<()> {
        match (&self.server.tls_cert_path, &self.server.tls_key_path) {
            (Some(_), None) | (None, Some(_)) => Err(AdvisorError::config(
                "server.tls_cert_path and server.tls_key_path must be set together",
            )
            .into()),
            _ => Ok(()),
        }
    }
}
