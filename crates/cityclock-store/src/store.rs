//! Typed access to the app group suite.
//!
//! Reads synchronize first because the other process may have written
//! since our last look. Nothing here returns an error: a missing, corrupt
//! or unreachable value reads as "no data" and a failed write is logged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cityclock_core::StoreError;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::defaults::SharedDefaults;
use crate::model::{CityRecord, SharedLocation, CITIES_SCHEMA_VERSION};

/// Keys in the shared suite.
pub mod keys {
    /// Ordered city list
    pub const CITIES: &str = "cities";
    /// Schema version of `CITIES`
    pub const CITIES_SCHEMA_VERSION: &str = "citiesSchemaVersion";
    /// Last raw device location
    pub const SHARED_LOCATION: &str = "sharedLocation";
    /// Pre-`sharedLocation` scalars. Read as a fallback, never written.
    pub const LEGACY_LATITUDE: &str = "latitude";
    pub const LEGACY_LONGITUDE: &str = "longitude";
    /// Bumped on every widget reload signal
    pub const RELOAD_GENERATION: &str = "widgetReloadGeneration";
}

/// City list and shared location, as seen by one process.
#[derive(Debug, Clone)]
pub struct SharedDataStore {
    defaults: Arc<SharedDefaults>,
}

impl SharedDataStore {
    pub fn new(defaults: Arc<SharedDefaults>) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &Arc<SharedDefaults> {
        &self.defaults
    }

    /// The stored city list, in stored order. Empty if absent or corrupt.
    pub fn read_cities(&self) -> Vec<CityRecord> {
        self.defaults.synchronize();
        match self.decode::<Vec<CityRecord>>(keys::CITIES) {
            Ok(Some(cities)) => cities,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Discarding unreadable city list: {}", e);
                Vec::new()
            }
        }
    }

    /// Replace the stored city list.
    ///
    /// Callers must follow up with a reload signal for the widget to notice.
    pub fn write_cities(&self, cities: &[CityRecord]) {
        match serde_json::to_value(cities) {
            Ok(value) => {
                self.defaults
                    .set_value(keys::CITIES_SCHEMA_VERSION, Value::from(CITIES_SCHEMA_VERSION));
                self.defaults.set_value(keys::CITIES, value);
                tracing::debug!("Wrote {} cities to shared container", cities.len());
            }
            Err(e) => tracing::warn!("Failed to encode city list: {}", e),
        }
    }

    /// Last shared location, falling back to the legacy scalar keys.
    pub fn read_location(&self) -> Option<SharedLocation> {
        self.defaults.synchronize();
        match self.decode::<SharedLocation>(keys::SHARED_LOCATION) {
            Ok(Some(location)) => return Some(location),
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring unreadable shared location: {}", e),
        }
        self.read_legacy_location()
    }

    pub fn write_location(&self, location: &SharedLocation) {
        match serde_json::to_value(location) {
            Ok(value) => self.defaults.set_value(keys::SHARED_LOCATION, value),
            Err(e) => tracing::warn!("Failed to encode shared location: {}", e),
        }
    }

    /// Older builds stored two bare numbers with no timestamp. Their age is
    /// unknown, so they are reported as the oldest possible reading.
    fn read_legacy_location(&self) -> Option<SharedLocation> {
        let latitude = self.defaults.value(keys::LEGACY_LATITUDE)?.as_f64()?;
        let longitude = self.defaults.value(keys::LEGACY_LONGITUDE)?.as_f64()?;
        tracing::debug!("Using legacy shared location keys");
        Some(SharedLocation {
            latitude,
            longitude,
            timestamp: DateTime::<Utc>::MIN_UTC,
        })
    }

    fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.defaults.value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }
}
