use async_trait::async_trait;
use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::WeatherSample;
use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::config::ApiConfig;

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: MainReadings,
    wind: WindReadings,
    visibility: u32,
    clouds: Clouds,
    rain: Option<Precipitation>,
    snow: Option<Precipitation>,
    sys: SunTimes,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct WindReadings {
    speed: f64,
    deg: f64,
    gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    all: u32,
}

#[derive(Debug, Deserialize)]
struct Precipitation {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SunTimes {
    sunrise: i64,
    sunset: i64,
}

/// Volume over the last hour, or zero when the provider reports none.
fn last_hour_or_zero(precipitation: Option<Precipitation>) -> f64 {
    precipitation.and_then(|p| p.one_hour).unwrap_or(0.0)
}

/// Map an OpenWeatherMap "current weather" body into a [`WeatherSample`].
///
/// `rain.1h`, `snow.1h` and `wind.gust` are optional upstream and become 0 when
/// absent. Every other field is required.
pub fn parse_current_weather(body: &str) -> Result<WeatherSample, AppError> {
    let response: CurrentWeatherResponse = serde_json::from_str(body)?;

    Ok(WeatherSample {
        temperature: response.main.temp,
        feels_like: response.main.feels_like,
        humidity: response.main.humidity,
        pressure: response.main.pressure,
        wind_speed: response.wind.speed,
        wind_direction: response.wind.deg,
        wind_gust: response.wind.gust.unwrap_or(0.0),
        visibility: response.visibility,
        cloudiness: response.clouds.all,
        rain_1h: last_hour_or_zero(response.rain),
        snow_1h: last_hour_or_zero(response.snow),
        sunrise: response.sys.sunrise,
        sunset: response.sys.sunset,
    })
}

/// Something that yields at most one weather sample per call.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// One fetch attempt. Failures are logged by the implementation and
    /// reported as `None`.
    async fn fetch_once(&self) -> Option<WeatherSample>;
}

pub struct OpenWeatherClient {
    http_client: HttpClient,
    base_url: String,
    location: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        Ok(Self {
            http_client: HttpClient::new(config.timeout)?,
            base_url: config.base_url.clone(),
            location: format!("{},{}", config.city, config.country),
            api_key: config.api_key.clone(),
        })
    }

    /// Single request to the provider, without logging the failure.
    async fn try_fetch(&self) -> Result<WeatherSample, AppError> {
        let query = [
            ("q", self.location.as_str()),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ];

        let body = self.http_client.get_text(&self.base_url, &query).await?;
        parse_current_weather(&body)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    #[instrument(skip(self), fields(location = %self.location))]
    async fn fetch_once(&self) -> Option<WeatherSample> {
        info!(
            timeout_ms = self.http_client.timeout().as_millis() as u64,
            "Fetching weather from API"
        );

        match self.try_fetch().await {
            Ok(sample) => Some(sample),
            Err(e) => {
                error!(error = %e, "Failed to fetch weather data");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_body() -> serde_json::Value {
        json!({
            "coord": { "lon": 13.41, "lat": 52.52 },
            "weather": [{ "id": 500, "main": "Rain", "description": "light rain" }],
            "main": {
                "temp": 5.2,
                "feels_like": 2.1,
                "temp_min": 4.0,
                "temp_max": 6.3,
                "pressure": 1012,
                "humidity": 80
            },
            "visibility": 10000,
            "wind": { "speed": 4.6, "deg": 250, "gust": 9.3 },
            "clouds": { "all": 75 },
            "rain": { "1h": 0.42 },
            "snow": { "1h": 0.1 },
            "sys": { "country": "DE", "sunrise": 1700000000, "sunset": 1700030000 },
            "name": "Berlin"
        })
    }

    #[test]
    fn maps_every_field_without_conversion() {
        let sample = parse_current_weather(&full_body().to_string()).unwrap();

        assert_eq!(
            sample,
            WeatherSample {
                temperature: 5.2,
                feels_like: 2.1,
                humidity: 80.0,
                pressure: 1012.0,
                wind_speed: 4.6,
                wind_direction: 250.0,
                wind_gust: 9.3,
                visibility: 10000,
                cloudiness: 75,
                rain_1h: 0.42,
                snow_1h: 0.1,
                sunrise: 1_700_000_000,
                sunset: 1_700_030_000,
            }
        );
    }

    #[test]
    fn absent_precipitation_and_gust_default_to_zero() {
        let mut body = full_body();
        let obj = body.as_object_mut().unwrap();
        obj.remove("rain");
        obj.remove("snow");
        obj["wind"].as_object_mut().unwrap().remove("gust");

        let sample = parse_current_weather(&body.to_string()).unwrap();
        assert_eq!(sample.rain_1h, 0.0);
        assert_eq!(sample.snow_1h, 0.0);
        assert_eq!(sample.wind_gust, 0.0);
        assert_eq!(sample.temperature, 5.2);
    }

    #[test]
    fn precipitation_object_without_hourly_value_defaults_to_zero() {
        let mut body = full_body();
        body["rain"] = json!({ "3h": 1.5 });

        let sample = parse_current_weather(&body.to_string()).unwrap();
        assert_eq!(sample.rain_1h, 0.0);
    }

    #[test]
    fn missing_required_field_is_a_parse_error() {
        let mut body = full_body();
        body["main"].as_object_mut().unwrap().remove("temp");

        let err = parse_current_weather(&body.to_string()).unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[tokio::test]
    async fn try_fetch_surfaces_the_upstream_status() {
        use std::time::Duration;
        use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = OpenWeatherClient::new(&ApiConfig {
            api_key: "key".to_string(),
            base_url: mock_server.uri(),
            city: "Nowhere".to_string(),
            country: "XX".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let err = client.try_fetch().await.unwrap_err();
        assert!(matches!(err, AppError::HttpError { status: 404, .. }));
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let err = parse_current_weather("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }
}
