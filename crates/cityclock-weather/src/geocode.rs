//! Reverse geocoding: convert coordinates to a city identity.
//! Uses Nominatim (OpenStreetMap) for the place name and country, and
//! Open-Meteo's `timezone=auto` for the IANA timezone.

use async_trait::async_trait;
use cityclock_core::{Coordinate, GeocodeError, WeatherConfig};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::types::{ForecastResponse, GeocodedPlace};

const USER_AGENT: &str = "CityClock/0.1.0 (https://github.com/cityclock)";

/// Coordinate → city name, country code, timezone.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<GeocodedPlace, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country_code: Option<String>,
}

impl NominatimAddress {
    /// Prefer city > town > village > municipality > county > state.
    fn place_name(self) -> Option<String> {
        self.city
            .or(self.town)
            .or(self.village)
            .or(self.municipality)
            .or(self.county)
            .or(self.state)
            .filter(|name| !name.trim().is_empty())
    }
}

/// HTTP reverse geocoder.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    geocode_url: String,
    forecast_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &WeatherConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        Ok(Self {
            client,
            geocode_url: config.geocode_url.clone(),
            forecast_url: config.forecast_url.clone(),
        })
    }

    async fn lookup_place(&self, coordinate: Coordinate) -> Result<(String, String), GeocodeError> {
        let response = self
            .client
            .get(&self.geocode_url)
            .query(&[
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::InvalidResponse(format!(
                "reverse geocode returned status {}",
                response.status()
            )));
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        let no_result = || GeocodeError::NoResult {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        };

        let address = body.address.ok_or_else(no_result)?;
        let country_code = address
            .country_code
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(no_result)?
            .to_uppercase();
        let name = address.place_name().ok_or_else(no_result)?;

        Ok((name, country_code))
    }

    async fn lookup_time_zone(&self, coordinate: Coordinate) -> Result<String, GeocodeError> {
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::InvalidResponse(format!(
                "timezone lookup returned status {}",
                response.status()
            )));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        body.timezone
            .filter(|tz| !tz.is_empty())
            .ok_or_else(|| GeocodeError::InvalidResponse("missing timezone".to_string()))
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<GeocodedPlace, GeocodeError> {
        let (city_name, country_code) = self.lookup_place(coordinate).await?;
        let time_zone_identifier = self.lookup_time_zone(coordinate).await?;

        tracing::info!(
            "Reverse geocoded {:.4}, {:.4} to {}, {} ({})",
            coordinate.latitude,
            coordinate.longitude,
            city_name,
            country_code,
            time_zone_identifier
        );

        Ok(GeocodedPlace {
            city_name,
            country_code,
            time_zone_identifier,
        })
    }
}
