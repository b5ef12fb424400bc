pub mod clock;
pub mod config;
pub mod error;
pub mod freshness;
pub mod geo;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CitiesConfig, Config, FreshnessConfig, ReloadConfig, SharedConfig, TemperatureUnit,
    TimelineConfig, WeatherConfig,
};
pub use error::{
    AppError, CityRejection, ConfigError, GeocodeError, StoreError, WeatherError,
};
pub use freshness::{age, classify, classify_with_fetch, stale_backdate, FreshnessState};
pub use geo::{Coordinate, EARTH_RADIUS_KM};

use anyhow::Result;

/// Initialize process-wide logging.
///
/// Both the app process and the widget process call this once at startup;
/// later calls are ignored.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("CityClock core initialized");
    Ok(())
}
