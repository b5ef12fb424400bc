//! Centralized error types for CityClock.
//!
//! Most of these never reach a caller. Storage errors are absorbed at the
//! shared data store boundary, geocode and weather errors are absorbed by
//! the location handler. They still carry full context so they can be
//! logged where they are swallowed.

use thiserror::Error;

/// City identifiers are carried as strings at this layer.
pub type CityId = String;

/// Top-level error type for the binary edge.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Geocoding error: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("City rejected: {0}")]
    Rejected(#[from] CityRejection),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a short message suitable for showing to a user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Store(e) => e.user_message(),
            AppError::Geocode(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Rejected(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Shared container errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Shared container unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Corrupt value for key {key}: {message}")]
    Corrupt { key: String, message: String },
}

impl StoreError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "Shared storage is unavailable. Try reinstalling the app.",
            StoreError::Io(_) => "Unable to access saved cities. Please try again.",
            StoreError::Codec(_) | StoreError::Corrupt { .. } => {
                "Saved cities could not be read and were reset."
            }
        }
    }
}

/// Reverse geocoding failures.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No place found at {latitude}, {longitude}")]
    NoResult { latitude: f64, longitude: f64 },

    #[error("Unexpected geocoder response: {0}")]
    InvalidResponse(String),
}

impl GeocodeError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GeocodeError::Network(_) => "Unable to look up your city. Check your connection.",
            GeocodeError::NoResult { .. } => "No city found for your location.",
            GeocodeError::InvalidResponse(_) => "City lookup returned an unexpected response.",
        }
    }
}

/// Weather lookup failures.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {status}")]
    Server { status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Network(_) => "Unable to fetch weather. Check your connection.",
            WeatherError::Server { .. } => "The weather service is unavailable. Try again later.",
            WeatherError::Parse(_) => "Weather data could not be read.",
        }
    }
}

/// Repository operations that were refused to keep the city list valid.
///
/// A rejected operation leaves the list untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CityRejection {
    #[error("City list is full ({max} cities)")]
    CapacityReached { max: usize },

    #[error("Duplicate of existing city {existing_id}")]
    Duplicate { existing_id: CityId },

    #[error("The current-location city cannot be removed or reordered")]
    PrimaryImmutable,

    #[error("City not found: {0}")]
    NotFound(CityId),

    #[error("Invalid coordinate")]
    InvalidCoordinate,
}

impl CityRejection {
    pub fn user_message(&self) -> &'static str {
        match self {
            CityRejection::CapacityReached { .. } => "You can track up to five cities.",
            CityRejection::Duplicate { .. } => "That city is already in your list.",
            CityRejection::PrimaryImmutable => "Your current location always stays first.",
            CityRejection::NotFound(_) => "That city is no longer in your list.",
            CityRejection::InvalidCoordinate => "That location is not valid.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}
