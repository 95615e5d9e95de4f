//! Geonews Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with defaults matching the published
//! dataset layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Source dataset
    pub input: InputConfig,

    /// Output dataset, GeoJSON export and checkpoint
    pub output: OutputConfig,

    /// Geocoding service
    pub geocoder: GeocoderConfig,

    /// Language model backend
    pub nlp: NlpConfig,

    /// Publishing step
    pub publish: PublishConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Files
        if let Ok(path) = std::env::var("GEONEWS_INPUT") {
            config.input.path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("GEONEWS_OUTPUT") {
            config.output.csv_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("GEONEWS_GEOJSON") {
            config.output.geojson_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("GEONEWS_CHECKPOINT") {
            config.output.checkpoint_path = PathBuf::from(path);
        }

        // Geocoder
        if let Ok(url) = std::env::var("NOMINATIM_URL") {
            config.geocoder.base_url = url;
        }
        if let Ok(agent) = std::env::var("NOMINATIM_USER_AGENT") {
            config.geocoder.user_agent = agent;
        }
        if let Ok(secs) = std::env::var("GEOCODER_TIMEOUT_SECS") {
            config.geocoder.timeout_secs = parse_value("GEOCODER_TIMEOUT_SECS", &secs)?;
        }
        if let Ok(ms) = std::env::var("GEOCODER_MIN_INTERVAL_MS") {
            config.geocoder.min_interval_ms = parse_value("GEOCODER_MIN_INTERVAL_MS", &ms)?;
        }

        // NLP
        if let Ok(backend) = std::env::var("NLP_BACKEND") {
            config.nlp.backend = backend.parse()?;
        }
        if let Ok(url) = std::env::var("NLP_URL") {
            config.nlp.url = url;
        }

        // Publishing
        if let Ok(enabled) = std::env::var("GEONEWS_PUBLISH") {
            config.publish.enabled = parse_value("GEONEWS_PUBLISH", &enabled)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            config.logging.json_format = parse_value("LOG_JSON", &json)?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse TOML content
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.input.path != defaults.input.path {
            self.input.path = env_config.input.path;
        }
        if env_config.output.csv_path != defaults.output.csv_path {
            self.output.csv_path = env_config.output.csv_path;
        }
        if env_config.output.geojson_path != defaults.output.geojson_path {
            self.output.geojson_path = env_config.output.geojson_path;
        }
        if env_config.output.checkpoint_path != defaults.output.checkpoint_path {
            self.output.checkpoint_path = env_config.output.checkpoint_path;
        }
        if env_config.geocoder.base_url != defaults.geocoder.base_url {
            self.geocoder.base_url = env_config.geocoder.base_url;
        }
        if env_config.geocoder.user_agent != defaults.geocoder.user_agent {
            self.geocoder.user_agent = env_config.geocoder.user_agent;
        }
        if env_config.geocoder.timeout_secs != defaults.geocoder.timeout_secs {
            self.geocoder.timeout_secs = env_config.geocoder.timeout_secs;
        }
        if env_config.geocoder.min_interval_ms != defaults.geocoder.min_interval_ms {
            self.geocoder.min_interval_ms = env_config.geocoder.min_interval_ms;
        }
        if env_config.nlp.backend != defaults.nlp.backend {
            self.nlp.backend = env_config.nlp.backend;
        }
        if env_config.nlp.url != defaults.nlp.url {
            self.nlp.url = env_config.nlp.url;
        }
        if env_config.publish.enabled != defaults.publish.enabled {
            self.publish.enabled = env_config.publish.enabled;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format != defaults.logging.json_format {
            self.logging.json_format = env_config.logging.json_format;
        }

        Ok(self)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Source dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Path to the source CSV (columns `medio`, `texto`)
    pub path: PathBuf,

    /// Encodings tried in order until one decodes the file; latin-1 accepts
    /// any byte, so later entries are never tried
    pub encodings: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("fuente_noticias.csv"),
            encodings: vec![
                "utf-8".to_string(),
                "windows-1252".to_string(),
                "latin-1".to_string(),
            ],
        }
    }
}

/// Output file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only output CSV
    pub csv_path: PathBuf,

    /// GeoJSON export consumed by the map
    pub geojson_path: PathBuf,

    /// Side file holding the last processed record number
    pub checkpoint_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("ubicaciones_extraidas.csv"),
            geojson_path: PathBuf::from("ubicaciones_extraidas.geojson"),
            checkpoint_path: PathBuf::from(".procesamiento_checkpoint.txt"),
        }
    }
}

/// Geocoding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Nominatim base URL
    pub base_url: String,

    /// User agent required by the Nominatim usage policy
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Pause before every request, in milliseconds
    pub min_interval_ms: u64,

    /// Country appended to every query
    pub country: String,

    /// City assumed for bare street addresses
    pub default_city: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "peru_news_geolocator".to_string(),
            timeout_secs: 10,
            min_interval_ms: 1000,
            country: "Perú".to_string(),
            default_city: "Lima".to_string(),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NlpConfig {
    /// Which annotator to use
    pub backend: NlpBackend,

    /// Base URL of the annotation sidecar (http backend)
    pub url: String,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            backend: NlpBackend::Rules,
            url: "http://localhost:8090".to_string(),
        }
    }
}

/// Supported annotator backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NlpBackend {
    /// Offline rule-based annotator
    Rules,
    /// Remote model served over HTTP
    Http,
}

impl std::str::FromStr for NlpBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rules" | "rule" => Ok(Self::Rules),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidValue {
                key: "NLP_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Publishing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Commit and push the output after a run
    pub enabled: bool,

    /// Commit message; a timestamped one is generated when absent
    pub commit_message: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
