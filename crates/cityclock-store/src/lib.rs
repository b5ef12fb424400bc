//! Shared data store for CityClock.
//!
//! The app and the widget run in separate processes and only meet in the
//! app group container. This crate owns the on-disk schema of that
//! container and the reload signal that tells the widget to re-read it.

pub mod defaults;
pub mod model;
pub mod reload;
pub mod store;

pub use defaults::SharedDefaults;
pub use model::{CityRecord, SharedLocation, CITIES_SCHEMA_VERSION};
pub use reload::{reload_generation, ContainerReloader, TimelineReloader};
pub use store::{keys, SharedDataStore};
