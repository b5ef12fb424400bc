//! The widget's own view of the shared container.
//!
//! The widget does not link the app's repository. It decodes the same
//! on-disk JSON into its own types, keyed by the same names, and tolerates
//! anything it does not know about. `tests/contract.rs` pins the two sides
//! together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cityclock_core::Coordinate;
use cityclock_store::SharedDefaults;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

pub const CITIES_KEY: &str = "cities";
pub const LOCATION_KEY: &str = "sharedLocation";
pub const LEGACY_LATITUDE_KEY: &str = "latitude";
pub const LEGACY_LONGITUDE_KEY: &str = "longitude";

/// A city as the widget renders it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetCity {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub time_zone_identifier: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub sort_order: usize,
}

impl WidgetCity {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WidgetLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl WidgetLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Read-only access to the shared suite from the widget process.
#[derive(Debug, Clone)]
pub struct WidgetReader {
    defaults: Arc<SharedDefaults>,
}

impl WidgetReader {
    pub fn new(defaults: Arc<SharedDefaults>) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &Arc<SharedDefaults> {
        &self.defaults
    }

    /// Cities in display order. Unreadable entries are skipped, not fatal.
    pub fn cities(&self) -> Vec<WidgetCity> {
        self.defaults.synchronize();
        let Some(Value::Array(items)) = self.defaults.value(CITIES_KEY) else {
            return Vec::new();
        };

        let mut cities: Vec<WidgetCity> = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(city) => Some(city),
                Err(e) => {
                    tracing::warn!("Skipping undecodable city: {}", e);
                    None
                }
            })
            .collect();
        cities.sort_by_key(|c| c.sort_order);
        cities
    }

    /// Last device location, or the pre-timestamp legacy pair.
    pub fn location(&self) -> Option<WidgetLocation> {
        self.defaults.synchronize();
        if let Some(value) = self.defaults.value(LOCATION_KEY) {
            match serde_json::from_value(value) {
                Ok(location) => return Some(location),
                Err(e) => tracing::warn!("Ignoring unreadable shared location: {}", e),
            }
        }

        let latitude = self.defaults.value(LEGACY_LATITUDE_KEY)?.as_f64()?;
        let longitude = self.defaults.value(LEGACY_LONGITUDE_KEY)?.as_f64()?;
        Some(WidgetLocation {
            latitude,
            longitude,
            timestamp: None,
        })
    }
}

/// The city the widget leads with: the primary, else the first.
pub fn lead_city(cities: &[WidgetCity]) -> Option<&WidgetCity> {
    cities.iter().find(|c| c.is_primary).or_else(|| cities.first())
}
