use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One observation of current weather for the monitored city.
///
/// Units follow the provider's "metric" unit system. Precipitation and gust
/// fields are zero when the provider omits them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct WeatherSample {
    /// Celsius
    pub temperature: f64,
    /// Celsius
    pub feels_like: f64,
    /// Percent
    pub humidity: f64,
    /// hPa
    pub pressure: f64,
    /// m/s
    pub wind_speed: f64,
    /// Degrees, 0-360
    pub wind_direction: f64,
    /// m/s
    pub wind_gust: f64,
    /// Meters
    pub visibility: u32,
    /// Percent
    pub cloudiness: u32,
    /// mm over the last hour
    pub rain_1h: f64,
    /// mm over the last hour
    pub snow_1h: f64,
    /// Unix seconds
    pub sunrise: i64,
    /// Unix seconds
    pub sunset: i64,
}

/// Health check payload
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}
