//! Test doubles shared by the sync crate's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use cityclock_core::{Coordinate, GeocodeError, ManualClock, WeatherError};
use cityclock_store::{CityRecord, SharedDataStore, SharedDefaults, TimelineReloader};
use cityclock_weather::{GeocodedPlace, ReverseGeocoder, TemperatureProvider};
use parking_lot::Mutex;
use tempfile::TempDir;

use crate::repository::{CityRepository, RepositorySettings};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
}

pub fn city_at(name: &str, latitude: f64, longitude: f64) -> CityRecord {
    CityRecord::new(name, "XX", Coordinate::new(latitude, longitude), "UTC")
}

/// Counts reload signals instead of sending them.
#[derive(Default)]
pub struct RecordingReloader {
    count: AtomicUsize,
}

impl RecordingReloader {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl TimelineReloader for RecordingReloader {
    fn reload_all_timelines(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Returns a scripted result and counts calls.
pub struct ScriptedGeocoder {
    place: Mutex<Option<GeocodedPlace>>,
    calls: AtomicUsize,
}

impl ScriptedGeocoder {
    pub fn succeeding(place: GeocodedPlace) -> Self {
        Self {
            place: Mutex::new(Some(place)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            place: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReverseGeocoder for ScriptedGeocoder {
    async fn reverse_geocode(&self, _coordinate: Coordinate) -> Result<GeocodedPlace, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.place
            .lock()
            .clone()
            .ok_or_else(|| GeocodeError::Network("offline".to_string()))
    }
}

/// Returns a scripted temperature (or failure) and counts calls.
pub struct ScriptedWeather {
    temperature: Mutex<Option<f64>>,
    calls: AtomicUsize,
}

impl ScriptedWeather {
    pub fn succeeding(temperature: f64) -> Self {
        Self {
            temperature: Mutex::new(Some(temperature)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            temperature: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemperatureProvider for ScriptedWeather {
    async fn fetch_temperature(&self, _coordinate: Coordinate) -> Result<f64, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (*self.temperature.lock()).ok_or(WeatherError::Server { status: 503 })
    }
}

/// A store in a temporary container, a manual clock and a counting reloader.
pub struct Harness {
    _dir: TempDir,
    store: SharedDataStore,
    clock: Arc<ManualClock>,
    reloader: Arc<RecordingReloader>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let defaults = Arc::new(SharedDefaults::open(dir.path()));
        Self {
            store: SharedDataStore::new(defaults),
            _dir: dir,
            clock: Arc::new(ManualClock::new(start_time())),
            reloader: Arc::new(RecordingReloader::default()),
        }
    }

    pub fn repository(&self) -> CityRepository {
        CityRepository::new(
            self.store.clone(),
            self.reloader.clone(),
            self.clock.clone(),
            RepositorySettings::default(),
        )
    }

    pub fn store(&self) -> &SharedDataStore {
        &self.store
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        use cityclock_core::Clock;
        self.clock.now()
    }

    pub fn reloads(&self) -> usize {
        self.reloader.count()
    }
}
