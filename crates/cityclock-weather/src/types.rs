use serde::{Deserialize, Serialize};

/// City identity resolved from a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub city_name: String,
    /// ISO 3166-1 alpha-2, upper case
    pub country_code: String,
    /// IANA timezone
    pub time_zone_identifier: String,
}

impl GeocodedPlace {
    pub fn new(
        city_name: impl Into<String>,
        country_code: impl Into<String>,
        time_zone_identifier: impl Into<String>,
    ) -> Self {
        Self {
            city_name: city_name.into(),
            country_code: country_code.into(),
            time_zone_identifier: time_zone_identifier.into(),
        }
    }
}

/// Open-Meteo forecast response, reduced to the fields we read.
#[derive(Debug, Deserialize)]
pub(crate) struct ForecastResponse {
    pub timezone: Option<String>,
    pub current: Option<CurrentBlock>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentBlock {
    pub temperature_2m: Option<f64>,
}
