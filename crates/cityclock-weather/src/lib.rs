//! Weather and geocoding collaborators for CityClock.
//!
//! The sync layer only sees the `ReverseGeocoder` and `TemperatureProvider`
//! traits. The HTTP implementations use Nominatim (OpenStreetMap) for place
//! names and Open-Meteo for temperatures and timezones; neither needs an
//! API key.

pub mod geocode;
pub mod location;
pub mod provider;
pub mod types;

pub use geocode::{NominatimGeocoder, ReverseGeocoder};
pub use location::{location_channel, LocationEvent, LocationSender, LocationStream};
pub use provider::{OpenMeteoProvider, TemperatureProvider};
pub use types::GeocodedPlace;
