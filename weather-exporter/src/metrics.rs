use common::errors::AppError;
use common::models::WeatherSample;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tokio::sync::RwLock;

const LABEL_CITY: &str = "city";

/// Content type of the text exposition format served on `/metrics`.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

struct WeatherGauges {
    temperature: GaugeVec,
    humidity: GaugeVec,
    pressure: GaugeVec,
    wind_speed: GaugeVec,
    wind_direction: GaugeVec,
    wind_gust: GaugeVec,
    clouds: GaugeVec,
    visibility: GaugeVec,
    rain: GaugeVec,
    snow: GaugeVec,
    feels_like: GaugeVec,
    sunrise: GaugeVec,
    sunset: GaugeVec,
}

/// Gauges for every [`WeatherSample`] field, labeled with the monitored city.
///
/// Series appear on the first [`MetricSet::publish`]. A publish replaces all
/// values while holding the write lock and [`MetricSet::render`] gathers under
/// the read lock, so a scrape sees either the previous sample or the new one.
pub struct MetricSet {
    city: String,
    registry: Registry,
    gauges: RwLock<WeatherGauges>,
}

impl MetricSet {
    pub fn new(city: impl Into<String>) -> Result<Self, AppError> {
        let registry = Registry::new();
        let gauge = |name: &str, help: &str| -> Result<GaugeVec, AppError> {
            let vec = GaugeVec::new(Opts::new(name, help), &[LABEL_CITY])
                .map_err(|e| AppError::metrics(format!("Failed to create {name}: {e}")))?;
            registry
                .register(Box::new(vec.clone()))
                .map_err(|e| AppError::metrics(format!("Failed to register {name}: {e}")))?;
            Ok(vec)
        };

        let gauges = WeatherGauges {
            temperature: gauge("weather_temperature", "Temperature in Celsius")?,
            humidity: gauge("weather_humidity", "Humidity in percentage")?,
            pressure: gauge("weather_pressure", "Pressure in hPa")?,
            wind_speed: gauge("weather_wind_speed", "Wind speed in m/s")?,
            wind_direction: gauge("weather_wind_direction", "Wind direction in degrees")?,
            wind_gust: gauge("weather_wind_gust", "Wind gust in m/s")?,
            clouds: gauge("weather_clouds", "Cloudiness in percentage")?,
            visibility: gauge("weather_visibility", "Visibility in meters")?,
            rain: gauge("weather_rain", "Rain volume in mm (last 1 hour)")?,
            snow: gauge("weather_snow", "Snow volume in mm (last 1 hour)")?,
            feels_like: gauge("weather_feels_like", "Feels-like temperature in Celsius")?,
            sunrise: gauge("weather_sunrise", "Sunrise time in Unix seconds")?,
            sunset: gauge("weather_sunset", "Sunset time in Unix seconds")?,
        };

        Ok(Self {
            city: city.into(),
            registry,
            gauges: RwLock::new(gauges),
        })
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    /// Overwrite every gauge with the matching field of `sample`.
    pub async fn publish(&self, sample: &WeatherSample) {
        let gauges = self.gauges.write().await;
        let city = [self.city.as_str()];

        gauges.temperature.with_label_values(&city).set(sample.temperature);
        gauges.humidity.with_label_values(&city).set(sample.humidity);
        gauges.pressure.with_label_values(&city).set(sample.pressure);
        gauges.wind_speed.with_label_values(&city).set(sample.wind_speed);
        gauges.wind_direction.with_label_values(&city).set(sample.wind_direction);
        gauges.wind_gust.with_label_values(&city).set(sample.wind_gust);
        gauges.clouds.with_label_values(&city).set(f64::from(sample.cloudiness));
        gauges.visibility.with_label_values(&city).set(f64::from(sample.visibility));
        gauges.rain.with_label_values(&city).set(sample.rain_1h);
        gauges.snow.with_label_values(&city).set(sample.snow_1h);
        gauges.feels_like.with_label_values(&city).set(sample.feels_like);
        gauges.sunrise.with_label_values(&city).set(sample.sunrise as f64);
        gauges.sunset.with_label_values(&city).set(sample.sunset as f64);
    }

    /// Encode all gauges in the Prometheus text format.
    pub async fn render(&self) -> Result<String, AppError> {
        let families = {
            let _gauges = self.gauges.read().await;
            self.registry.gather()
        };

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| AppError::metrics(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| AppError::metrics(format!("Metrics output is not UTF-8: {e}")))
    }
}
