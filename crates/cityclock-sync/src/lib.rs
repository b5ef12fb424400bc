//! App-process synchronization core.
//!
//! `CityRepository` is the only writer of the shared city list.
//! `LocationUpdateHandler` turns significant location changes into primary
//! city updates, and `WeatherRefresher` keeps the other cities' temperatures
//! current.

pub mod location_update;
pub mod refresh;
pub mod repository;
pub mod throttle;

#[cfg(test)]
pub(crate) mod testing;

pub use location_update::{LocationUpdateHandler, LocationUpdateOutcome};
pub use refresh::{RefreshSummary, WeatherRefresher};
pub use repository::{CityRepository, RepositorySettings};
pub use throttle::ReloadThrottle;
