use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "SKYRANK_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.weather.yandex.ru";
const MAX_RECOMMENDED_CONCURRENCY: usize = 8;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Join all errors into a single line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cities to rank, in reporting order
    #[serde(default = "default_cities")]
    pub cities: Vec<CityConfig>,

    /// Forecast source settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Where reduced per-city rows are written
    #[serde(default)]
    pub output: OutputConfig,
}

/// A city and the coordinates its forecast is requested for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CityConfig {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Forecast API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; falls back to `SKYRANK_API_KEY` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Maximum number of forecasts fetched at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FetchConfig {
    /// The configured API key, or the one from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

/// File format of the per-city output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("cities_data.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: OutputFormat::Json,
        }
    }
}

fn default_cities() -> Vec<CityConfig> {
    vec![
        CityConfig::new("Moscow", 55.7558, 37.6173),
        CityConfig::new("Paris", 48.8566, 2.3522),
        CityConfig::new("London", 51.5074, -0.1278),
        CityConfig::new("Berlin", 52.5200, 13.4050),
        CityConfig::new("Beijing", 39.9042, 116.4074),
        CityConfig::new("Kazan", 55.7963, 49.1088),
        CityConfig::new("Saint Petersburg", 59.9343, 30.3351),
        CityConfig::new("Volgograd", 48.7080, 44.5133),
        CityConfig::new("Novosibirsk", 55.0084, 82.9357),
        CityConfig::new("Kaliningrad", 54.7104, 20.4522),
        CityConfig::new("Abu Dhabi", 24.4539, 54.3773),
        CityConfig::new("Warsaw", 52.2297, 21.0122),
        CityConfig::new("Bucharest", 44.4268, 26.1025),
        CityConfig::new("Rome", 41.9028, 12.4964),
        CityConfig::new("Cairo", 30.0444, 31.2357),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cities: default_cities(),
            fetch: FetchConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors abort the load.
    pub fn load_validated(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        // An empty batch is reported by the pipeline as "no data"
        if self.cities.is_empty() {
            result.add_warning("cities", "No cities configured");
        }

        let mut seen = HashSet::new();
        for (i, city) in self.cities.iter().enumerate() {
            let field = format!("cities[{}]", i);
            if city.name.trim().is_empty() {
                result.add_error(&field, "City name must not be empty");
            } else if !seen.insert(city.name.as_str()) {
                result.add_error(&field, format!("Duplicate city: {}", city.name));
            }
            if !(-90.0..=90.0).contains(&city.latitude) {
                result.add_error(&field, format!("Latitude out of range: {}", city.latitude));
            }
            if !(-180.0..=180.0).contains(&city.longitude) {
                result.add_error(&field, format!("Longitude out of range: {}", city.longitude));
            }
        }

        self.validate_url(&self.fetch.base_url, "fetch.base_url", &mut result);

        if self.fetch.concurrency == 0 {
            result.add_error("fetch.concurrency", "Concurrency must be greater than 0");
        } else if self.fetch.concurrency > MAX_RECOMMENDED_CONCURRENCY {
            result.add_warning(
                "fetch.concurrency",
                format!(
                    "More than {} concurrent requests may be throttled",
                    MAX_RECOMMENDED_CONCURRENCY
                ),
            );
        }

        if self.fetch.timeout_secs == 0 {
            result.add_error("fetch.timeout_secs", "Timeout must be greater than 0");
        }

        if self.fetch.resolved_api_key().is_none() {
            result.add_warning(
                "fetch.api_key",
                format!("No API key configured and {} is not set", API_KEY_ENV),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Names of all configured cities, in order
    pub fn city_names(&self) -> Vec<String> {
        self.cities.iter().map(|c| c.name.clone()).collect()
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create config directory")?;
            }
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skyrank");

        Ok(config_dir.join("config.toml"))
    }
}
