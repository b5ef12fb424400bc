//! Persisted records.
//!
//! Field names are camelCase on disk and must stay decodable across app
//! versions: new fields get `#[serde(default)]`, nothing is renamed or
//! removed.

use chrono::{DateTime, Utc};
use cityclock_core::Coordinate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version written next to the city list. Bumped only for additive changes.
pub const CITIES_SCHEMA_VERSION: u32 = 1;

/// One tracked city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityRecord {
    /// Stable identity, never regenerated for the same logical city
    pub id: Uuid,
    pub name: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone, e.g. "America/Phoenix"
    pub time_zone_identifier: String,
    /// Last known temperature, in the configured unit
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// The current-location city
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub sort_order: usize,
}

impl CityRecord {
    /// A new non-primary city with a fresh identifier and no weather yet.
    pub fn new(
        name: impl Into<String>,
        country_code: impl Into<String>,
        coordinate: Coordinate,
        time_zone_identifier: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            country_code: country_code.into(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            time_zone_identifier: time_zone_identifier.into(),
            temperature: None,
            last_updated: None,
            is_primary: false,
            sort_order: 0,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Record a successful weather reading.
    pub fn with_temperature(mut self, temperature: f64, at: DateTime<Utc>) -> Self {
        self.temperature = Some(temperature);
        self.last_updated = Some(at);
        self
    }
}

/// Last raw device coordinate, independent of any city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl SharedLocation {
    pub fn new(coordinate: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            timestamp,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}
