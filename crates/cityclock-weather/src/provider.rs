use async_trait::async_trait;
use cityclock_core::{Coordinate, TemperatureUnit, WeatherConfig, WeatherError};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::types::ForecastResponse;

/// Coordinate → current temperature in the configured unit.
#[async_trait]
pub trait TemperatureProvider: Send + Sync {
    async fn fetch_temperature(&self, coordinate: Coordinate) -> Result<f64, WeatherError>;
}

/// Open-Meteo current conditions.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: Arc<Client>,
    forecast_url: String,
    unit: TemperatureUnit,
}

impl OpenMeteoProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            forecast_url: config.forecast_url.clone(),
            unit: config.temperature_unit,
        })
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }
}

#[async_trait]
impl TemperatureProvider for OpenMeteoProvider {
    async fn fetch_temperature(&self, coordinate: Coordinate) -> Result<f64, WeatherError> {
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("current", "temperature_2m".to_string()),
                ("temperature_unit", self.unit.as_query().to_string()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Weather request returned status {}", status);
            return Err(WeatherError::Server {
                status: status.as_u16(),
            });
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        let temperature = body
            .current
            .and_then(|c| c.temperature_2m)
            .filter(|t| t.is_finite())
            .ok_or_else(|| WeatherError::Parse("missing current.temperature_2m".to_string()))?;

        tracing::debug!(
            "Fetched {:.1} for {:.4}, {:.4}",
            temperature,
            coordinate.latitude,
            coordinate.longitude
        );
        Ok(temperature)
    }
}
