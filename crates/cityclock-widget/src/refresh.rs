//! Fetch-on-read for the primary city, from the widget process.
//!
//! The widget never rewrites the city list. When the primary reading is
//! stale it may fetch a temperature itself and patch exactly two fields of
//! the primary entry in the stored JSON: `temperature` and `lastUpdated`.
//! Every other field, known to us or not, is written back untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use cityclock_core::{classify, Config};
use cityclock_store::SharedDefaults;
use cityclock_weather::TemperatureProvider;
use serde_json::Value;

use crate::schema::{WidgetCity, WidgetReader, CITIES_KEY};

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetRefreshOutcome {
    /// The primary reading is still fresh.
    NotNeeded,
    NoPrimary,
    /// The device has moved away from the primary city; its identity is
    /// out of date, so a reading at its coordinate would be misleading.
    LocationMismatch { distance_km: f64 },
    FetchFailed,
    /// The stored primary moved, vanished or got a new reading while the
    /// fetch was in flight; the reading was dropped.
    PrimaryChanged,
    Updated { temperature: f64 },
}

pub struct PrimaryWeatherRefresher {
    reader: WidgetReader,
    weather: Arc<dyn TemperatureProvider>,
    stale_threshold: Duration,
    max_distance_km: f64,
}

impl PrimaryWeatherRefresher {
    pub fn new(
        defaults: Arc<SharedDefaults>,
        weather: Arc<dyn TemperatureProvider>,
        config: &Config,
    ) -> Self {
        Self {
            reader: WidgetReader::new(defaults),
            weather,
            stale_threshold: config.freshness.threshold(),
            max_distance_km: config.cities.duplicate_distance_km,
        }
    }

    pub async fn refresh_if_stale(&self, now: DateTime<Utc>) -> WidgetRefreshOutcome {
        let cities = self.reader.cities();
        let Some(primary) = cities.iter().find(|c| c.is_primary) else {
            return WidgetRefreshOutcome::NoPrimary;
        };

        if !classify(primary.last_updated, now, self.stale_threshold).needs_refresh() {
            return WidgetRefreshOutcome::NotNeeded;
        }

        if let Some(location) = self.reader.location() {
            let distance_km = location.coordinate().distance_km(&primary.coordinate());
            if distance_km > self.max_distance_km {
                tracing::info!(
                    "Device is {:.1} km from {}, leaving refresh to the app",
                    distance_km,
                    primary.name
                );
                return WidgetRefreshOutcome::LocationMismatch { distance_km };
            }
        }

        let temperature = match self.weather.fetch_temperature(primary.coordinate()).await {
            Ok(temperature) => temperature,
            Err(e) => {
                tracing::warn!("Widget weather fetch for {} failed: {}", primary.name, e);
                return WidgetRefreshOutcome::FetchFailed;
            }
        };

        if write_primary_reading(self.reader.defaults(), primary, temperature, now) {
            WidgetRefreshOutcome::Updated { temperature }
        } else {
            WidgetRefreshOutcome::PrimaryChanged
        }
    }
}

/// Patch the stored primary entry.
///
/// The entry must still be the one the fetch was made for: same id, still
/// primary, same coordinate and same `lastUpdated`. Returns false otherwise.
fn write_primary_reading(
    defaults: &SharedDefaults,
    primary: &WidgetCity,
    temperature: f64,
    at: DateTime<Utc>,
) -> bool {
    // Re-read right before writing to keep the window against the app short
    defaults.synchronize();
    let Some(Value::Array(mut items)) = defaults.value(CITIES_KEY) else {
        return false;
    };

    let id = primary.id.to_string();
    let Some(entry) = items.iter_mut().find_map(|item| {
        item.as_object_mut().filter(|obj| {
            obj.get("id").and_then(Value::as_str) == Some(id.as_str())
                && obj.get("isPrimary").and_then(Value::as_bool) == Some(true)
                && obj.get("latitude").and_then(Value::as_f64) == Some(primary.latitude)
                && obj.get("longitude").and_then(Value::as_f64) == Some(primary.longitude)
                && stored_timestamp(obj.get("lastUpdated")) == primary.last_updated
        })
    }) else {
        tracing::debug!("Primary city changed during widget refresh, dropping reading");
        return false;
    };

    entry.insert("temperature".to_string(), Value::from(temperature));
    entry.insert(
        "lastUpdated".to_string(),
        Value::from(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    );
    defaults.set_value(CITIES_KEY, Value::Array(items));

    tracing::info!("Widget stored {:.1} for {}", temperature, primary.name);
    true
}

fn stored_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let text = value?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
