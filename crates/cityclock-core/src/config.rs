use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

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

    /// Get a summary of all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Shared container location
    #[serde(default)]
    pub shared: SharedConfig,

    /// City list limits
    #[serde(default)]
    pub cities: CitiesConfig,

    /// Staleness threshold
    #[serde(default)]
    pub freshness: FreshnessConfig,

    /// Widget reload throttling
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Widget timeline shape
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Weather and geocoding services
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Location of the container shared by the app and widget processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// App group identifier; names the suite inside the container directory
    #[serde(default = "default_app_group")]
    pub app_group: String,

    /// Directory holding every app group suite
    #[serde(default = "default_container_dir")]
    pub container_dir: PathBuf,
}

fn default_app_group() -> String {
    "group.com.cityclock.shared".to_string()
}

fn default_container_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cityclock")
        .join("AppGroups")
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            app_group: default_app_group(),
            container_dir: default_container_dir(),
        }
    }
}

impl SharedConfig {
    /// Directory of this app group's suite.
    pub fn suite_dir(&self) -> PathBuf {
        self.container_dir.join(&self.app_group)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitiesConfig {
    /// Maximum number of tracked cities, current location included
    pub max_count: usize,

    /// Two cities closer than this are the same place
    pub duplicate_distance_km: f64,
}

impl Default for CitiesConfig {
    fn default() -> Self {
        Self {
            max_count: 5,
            duplicate_distance_km: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessConfig {
    /// A temperature older than this is stale
    pub stale_after_minutes: u32,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            stale_after_minutes: 15,
        }
    }
}

impl FreshnessConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_secs(u64::from(self.stale_after_minutes) * 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadConfig {
    /// Non-forced reload signals inside this window are suppressed
    pub cooldown_seconds: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 10,
        }
    }
}

impl ReloadConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

/// Upper bound on `timeline.entry_count`
pub const MAX_TIMELINE_ENTRIES: u32 = 24;

/// Upper bound on timeline spacing and refresh horizon: 7 days
pub const MAX_TIMELINE_SPAN_MINUTES: u32 = 7 * 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Entries produced per timeline
    pub entry_count: u32,

    /// Spacing between entries
    pub entry_interval_minutes: u32,

    /// Hint for when the widget should ask for a new timeline
    pub refresh_horizon_minutes: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            entry_count: 4,
            entry_interval_minutes: 60,
            refresh_horizon_minutes: 240,
        }
    }
}

/// Temperature unit stored in city records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Query value understood by Open-Meteo.
    pub fn as_query(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Unit temperatures are fetched and stored in
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Open-Meteo forecast endpoint
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Nominatim reverse geocoding endpoint
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_geocode_url() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::default(),
            forecast_url: default_forecast_url(),
            geocode_url: default_geocode_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if missing
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

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated_from(path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.shared.app_group.trim().is_empty() {
            result.add_error("shared.app_group", "App group identifier must not be empty");
        }

        if self.cities.max_count == 0 {
            result.add_error("cities.max_count", "At least one city must be allowed");
        } else if self.cities.max_count > 20 {
            result.add_warning("cities.max_count", "More than 20 cities will crowd the widget");
        }

        if !self.cities.duplicate_distance_km.is_finite() || self.cities.duplicate_distance_km < 0.0 {
            result.add_error(
                "cities.duplicate_distance_km",
                "Duplicate distance must be a non-negative number",
            );
        }

        if self.freshness.stale_after_minutes == 0 {
            result.add_error(
                "freshness.stale_after_minutes",
                "Staleness threshold must be greater than 0",
            );
        } else if self.freshness.stale_after_minutes > 1440 {
            result.add_warning(
                "freshness.stale_after_minutes",
                "Staleness threshold is more than 24 hours",
            );
        }

        if self.reload.cooldown_seconds == 0 {
            result.add_warning("reload.cooldown_seconds", "Widget reloads are not throttled");
        }

        if self.timeline.entry_count == 0 {
            result.add_error("timeline.entry_count", "Timeline needs at least one entry");
        } else if self.timeline.entry_count > MAX_TIMELINE_ENTRIES {
            result.add_error(
                "timeline.entry_count",
                format!("Timeline allows at most {} entries", MAX_TIMELINE_ENTRIES),
            );
        }
        if self.timeline.entry_interval_minutes > MAX_TIMELINE_SPAN_MINUTES {
            result.add_error(
                "timeline.entry_interval_minutes",
                "Entry interval must not exceed 7 days",
            );
        }
        if self.timeline.refresh_horizon_minutes == 0 {
            result.add_error(
                "timeline.refresh_horizon_minutes",
                "Refresh horizon must be greater than 0",
            );
        } else if self.timeline.refresh_horizon_minutes > MAX_TIMELINE_SPAN_MINUTES {
            result.add_error(
                "timeline.refresh_horizon_minutes",
                "Refresh horizon must not exceed 7 days",
            );
        }

        self.validate_url(&self.weather.forecast_url, "weather.forecast_url", &mut result);
        self.validate_url(&self.weather.geocode_url, "weather.geocode_url", &mut result);

        result
    }

    /// Validate a URL field
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

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("cityclock");

        Ok(config_dir.join("config.toml"))
    }
}
