//! Significant-location-change handling.
//!
//! For each coordinate, in this order:
//! 1. persist the raw location (always, even if everything after fails),
//! 2. reverse geocode; on failure stop and leave the primary city alone,
//! 3. fetch the temperature,
//! 4. build the new primary record, keeping the old id. A failed fetch
//!    keeps the previous temperature but backdates `last_updated` past the
//!    staleness threshold so every reader refetches,
//! 5. hand it to the repository's forced-reload path.

use std::sync::Arc;
use std::time::Duration;

use cityclock_core::{stale_backdate, CityRejection, Clock, Coordinate};
use cityclock_store::{CityRecord, SharedDataStore, SharedLocation};
use cityclock_weather::{GeocodedPlace, LocationStream, ReverseGeocoder, TemperatureProvider};

use crate::repository::CityRepository;

#[derive(Debug, Clone, PartialEq)]
pub enum LocationUpdateOutcome {
    /// The place could not be resolved; only the raw location was stored.
    GeocodeFailed,
    /// The primary city now reflects the new location.
    Updated {
        record: CityRecord,
        weather_refreshed: bool,
    },
    /// The repository refused the new primary record.
    Rejected(CityRejection),
}

pub struct LocationUpdateHandler {
    store: SharedDataStore,
    repository: Arc<CityRepository>,
    geocoder: Arc<dyn ReverseGeocoder>,
    weather: Arc<dyn TemperatureProvider>,
    clock: Arc<dyn Clock>,
    stale_threshold: Duration,
}

impl LocationUpdateHandler {
    pub fn new(
        store: SharedDataStore,
        repository: Arc<CityRepository>,
        geocoder: Arc<dyn ReverseGeocoder>,
        weather: Arc<dyn TemperatureProvider>,
        clock: Arc<dyn Clock>,
        stale_threshold: Duration,
    ) -> Self {
        Self {
            store,
            repository,
            geocoder,
            weather,
            clock,
            stale_threshold,
        }
    }

    pub async fn handle(&self, coordinate: Coordinate) -> LocationUpdateOutcome {
        self.store
            .write_location(&SharedLocation::new(coordinate, self.clock.now()));

        let place = match self.geocoder.reverse_geocode(coordinate).await {
            Ok(place) => place,
            Err(e) => {
                tracing::warn!("Reverse geocode failed, keeping current city: {}", e);
                return LocationUpdateOutcome::GeocodeFailed;
            }
        };

        let temperature = match self.weather.fetch_temperature(coordinate).await {
            Ok(temperature) => Some(temperature),
            Err(e) => {
                tracing::warn!("Weather fetch for {} failed: {}", place.city_name, e);
                None
            }
        };

        let record = self.primary_record(coordinate, place, temperature);
        match self.repository.update_current_location(record) {
            Ok(record) => LocationUpdateOutcome::Updated {
                record,
                weather_refreshed: temperature.is_some(),
            },
            Err(rejection) => {
                tracing::warn!("Current location not applied: {}", rejection);
                LocationUpdateOutcome::Rejected(rejection)
            }
        }
    }

    /// Handle events until every sender is gone.
    pub async fn run(&self, mut events: LocationStream) {
        while let Some(event) = events.next().await {
            self.handle(event.coordinate).await;
        }
        tracing::debug!("Location stream closed");
    }

    fn primary_record(
        &self,
        coordinate: Coordinate,
        place: GeocodedPlace,
        temperature: Option<f64>,
    ) -> CityRecord {
        let now = self.clock.now();
        let previous = self.repository.primary();

        let mut record = CityRecord::new(
            place.city_name,
            place.country_code,
            coordinate,
            place.time_zone_identifier,
        );
        record.is_primary = true;

        if let Some(previous) = &previous {
            record.id = previous.id;
        }

        match temperature {
            Some(temperature) => record.with_temperature(temperature, now),
            None => CityRecord {
                temperature: previous.and_then(|p| p.temperature),
                last_updated: Some(stale_backdate(now, self.stale_threshold)),
                ..record
            },
        }
    }
}
