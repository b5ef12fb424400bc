use anyhow::Result;
use std::sync::Arc;

use cityclock_core::{AppError, Clock, Config, Coordinate, SystemClock};
use cityclock_store::{CityRecord, ContainerReloader, SharedDataStore, SharedDefaults};
use cityclock_sync::{CityRepository, LocationUpdateHandler, RepositorySettings, WeatherRefresher};
use cityclock_weather::{NominatimGeocoder, OpenMeteoProvider, ReverseGeocoder, TemperatureProvider};
use cityclock_widget::{PrimaryWeatherRefresher, ReloadWatch, TimelineProvider, TimelineSettings, WidgetReader};

/// Main-process wiring: one repository, one store, one set of services.
pub struct App {
    config: Arc<Config>,
    store: SharedDataStore,
    repository: Arc<CityRepository>,
    geocoder: Arc<dyn ReverseGeocoder>,
    weather: Arc<dyn TemperatureProvider>,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Create the app from a validated config and the HTTP services.
    pub fn new(config: Config) -> Result<Self> {
        let geocoder = Arc::new(NominatimGeocoder::new(&config.weather)?);
        let weather = Arc::new(OpenMeteoProvider::new(&config.weather)?);
        Ok(Self::with_services(
            config,
            geocoder,
            weather,
            Arc::new(SystemClock),
        ))
    }

    pub fn with_services(
        config: Config,
        geocoder: Arc<dyn ReverseGeocoder>,
        weather: Arc<dyn TemperatureProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let suite_dir = config.shared.suite_dir();
        tracing::info!("Using shared container {}", suite_dir.display());

        let defaults = Arc::new(SharedDefaults::open(&suite_dir));
        let store = SharedDataStore::new(defaults.clone());
        let repository = Arc::new(CityRepository::new(
            store.clone(),
            Arc::new(ContainerReloader::new(defaults)),
            clock.clone(),
            RepositorySettings::from(&config),
        ));

        Self {
            config: Arc::new(config),
            store,
            repository,
            geocoder,
            weather,
            clock,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &Arc<CityRepository> {
        &self.repository
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Resolve a coordinate to a city and add it to the list.
    ///
    /// A failed temperature fetch still adds the city, without a reading.
    pub async fn add_city_at(
        &self,
        coordinate: Coordinate,
        name: Option<String>,
    ) -> Result<CityRecord, AppError> {
        let place = self.geocoder.reverse_geocode(coordinate).await?;
        let mut record = CityRecord::new(
            name.unwrap_or(place.city_name),
            place.country_code,
            coordinate,
            place.time_zone_identifier,
        );

        match self.weather.fetch_temperature(coordinate).await {
            Ok(temperature) => record = record.with_temperature(temperature, self.clock.now()),
            Err(e) => tracing::warn!("Adding {} without a temperature: {}", record.name, e),
        }

        Ok(self.repository.add_city(record)?)
    }

    pub fn location_handler(&self) -> LocationUpdateHandler {
        LocationUpdateHandler::new(
            self.store.clone(),
            self.repository.clone(),
            self.geocoder.clone(),
            self.weather.clone(),
            self.clock.clone(),
            self.config.freshness.threshold(),
        )
    }

    pub fn weather_refresher(&self) -> WeatherRefresher {
        WeatherRefresher::new(
            self.repository.clone(),
            self.weather.clone(),
            self.clock.clone(),
            self.config.freshness.threshold(),
        )
    }

    /// Widget-process view of the same container.
    ///
    /// Opens its own handle on the suite, as the extension process would.
    pub fn widget(&self) -> WidgetSide {
        let defaults = Arc::new(SharedDefaults::open(&self.config.shared.suite_dir()));
        WidgetSide {
            timeline: TimelineProvider::new(
                WidgetReader::new(defaults.clone()),
                TimelineSettings::from(self.config.as_ref()),
            ),
            refresher: PrimaryWeatherRefresher::new(
                defaults.clone(),
                self.weather.clone(),
                &self.config,
            ),
            watch: ReloadWatch::new(defaults),
        }
    }

    /// Send any reload the throttle held back.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down");
        if self.repository.flush_pending_reload() {
            tracing::debug!("Flushed pending widget reload");
        }
    }
}

/// The widget extension's collaborators.
pub struct WidgetSide {
    pub timeline: TimelineProvider,
    pub refresher: PrimaryWeatherRefresher,
    pub watch: ReloadWatch,
}
