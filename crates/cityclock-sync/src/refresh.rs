use std::sync::Arc;
use std::time::Duration;

use cityclock_core::{classify, Clock};
use cityclock_weather::TemperatureProvider;

use crate::repository::CityRepository;

/// Result of one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
    /// Cities that were still fresh, or moved or vanished mid-pass
    pub skipped: usize,
}

/// Routine temperature refresh for every city in the list.
///
/// Results go through `apply_reading`, so a burst of refreshes produces at
/// most one widget reload per cooldown window, and a reading is dropped if
/// its city moved while the fetch was in flight.
pub struct WeatherRefresher {
    repository: Arc<CityRepository>,
    weather: Arc<dyn TemperatureProvider>,
    clock: Arc<dyn Clock>,
    stale_threshold: Duration,
}

impl WeatherRefresher {
    pub fn new(
        repository: Arc<CityRepository>,
        weather: Arc<dyn TemperatureProvider>,
        clock: Arc<dyn Clock>,
        stale_threshold: Duration,
    ) -> Self {
        Self {
            repository,
            weather,
            clock,
            stale_threshold,
        }
    }

    /// Refetch every city that is stale or has never been fetched.
    pub async fn refresh_stale(&self) -> RefreshSummary {
        self.refresh(false).await
    }

    /// Refetch every city regardless of age.
    pub async fn refresh_all(&self) -> RefreshSummary {
        self.refresh(true).await
    }

    async fn refresh(&self, include_fresh: bool) -> RefreshSummary {
        // The widget may have written newer readings since we last looked
        self.repository.reload();

        let mut summary = RefreshSummary::default();
        for city in self.repository.cities() {
            let state = classify(city.last_updated, self.clock.now(), self.stale_threshold);
            if !include_fresh && !state.needs_refresh() {
                summary.skipped += 1;
                continue;
            }

            let fetched_at = city.coordinate();
            let temperature = match self.weather.fetch_temperature(fetched_at).await {
                Ok(temperature) => temperature,
                Err(e) => {
                    tracing::warn!("Weather refresh for {} failed: {}", city.name, e);
                    summary.failed += 1;
                    continue;
                }
            };

            match self
                .repository
                .apply_reading(city.id, fetched_at, temperature, self.clock.now())
            {
                Ok(Some(_)) => summary.refreshed += 1,
                Ok(None) => summary.skipped += 1,
                Err(rejection) => {
                    tracing::debug!("Dropping refresh for {}: {}", city.name, rejection);
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            "Weather refresh: {} refreshed, {} failed, {} skipped",
            summary.refreshed,
            summary.failed,
            summary.skipped
        );
        summary
    }
}
