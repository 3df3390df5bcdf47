use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use common::errors::AppError;
use config::{File, FileFormat};
use serde::Deserialize;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "WEATHER_EXPORTER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.ini";
const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

/// Exporter configuration, validated once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// `[WeatherAPI]` section.
#[derive(Clone, PartialEq)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub city: String,
    pub country: String,
    pub timeout: Duration,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("city", &self.city)
            .field("country", &self.country)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `[Prometheus]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    pub port: u16,
    pub scrape_interval: Duration,
}

/// `[Logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub log_file: PathBuf,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::config(format!(
                "Unknown log level '{value}'. Expected one of DEBUG, INFO, WARN, ERROR"
            ))),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

// Raw INI shape. Every value is read as a string so that presence and integer
// parsing are reported with the section and key that failed.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "WeatherAPI", alias = "weatherapi")]
    weather_api: Option<RawWeatherApi>,
    #[serde(rename = "Prometheus", alias = "prometheus")]
    prometheus: Option<RawPrometheus>,
    #[serde(rename = "Logging", alias = "logging")]
    logging: Option<RawLogging>,
}

#[derive(Debug, Deserialize)]
struct RawWeatherApi {
    api_key: Option<String>,
    base_url: Option<String>,
    city: Option<String>,
    country: Option<String>,
    timeout_seconds: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPrometheus {
    port: Option<String>,
    scrape_interval: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLogging {
    log_file: Option<String>,
    log_level: Option<String>,
}

impl Config {
    /// Path named by `WEATHER_EXPORTER_CONFIG`, or `config.ini`.
    pub fn path_from_env() -> PathBuf {
        config_path(env::var(CONFIG_PATH_ENV).ok())
    }

    /// Load and validate the INI file at `path`.
    ///
    /// Errors start with the file path. They are raised before logging is set
    /// up, so the returned message is the only record of the failure.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let source = File::from(path).format(FileFormat::Ini).required(true);
        Self::build(source).map_err(|e| match e {
            AppError::ConfigError(message) => {
                AppError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_ini_str(contents: &str) -> Result<Self, AppError> {
        Self::build(File::from_str(contents, FileFormat::Ini))
    }

    fn build<S>(source: S) -> Result<Self, AppError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let raw: RawConfig = config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AppError::config(e.to_string()))?;

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, AppError> {
        let api = raw.weather_api.ok_or_else(|| missing_section("WeatherAPI"))?;
        let prometheus = raw.prometheus.ok_or_else(|| missing_section("Prometheus"))?;
        let logging = raw.logging.ok_or_else(|| missing_section("Logging"))?;

        let timeout_seconds = match api.timeout_seconds {
            Some(value) => parse_positive("WeatherAPI", "timeout_seconds", &value)?,
            None => DEFAULT_TIMEOUT_SECONDS,
        };

        let api = ApiConfig {
            api_key: required("WeatherAPI", "api_key", api.api_key)?,
            base_url: required("WeatherAPI", "base_url", api.base_url)?,
            city: required("WeatherAPI", "city", api.city)?,
            country: required("WeatherAPI", "country", api.country)?,
            timeout: Duration::from_secs(timeout_seconds),
        };

        let port = required("Prometheus", "port", prometheus.port)?;
        let port: u16 = parse_integer("Prometheus", "port", &port)?;
        if port == 0 {
            return Err(AppError::config("Prometheus.port must be between 1 and 65535"));
        }
        let interval = required("Prometheus", "scrape_interval", prometheus.scrape_interval)?;
        let metrics = MetricsConfig {
            port,
            scrape_interval: Duration::from_secs(parse_positive(
                "Prometheus",
                "scrape_interval",
                &interval,
            )?),
        };

        let logging = LoggingConfig {
            log_file: PathBuf::from(required("Logging", "log_file", logging.log_file)?),
            log_level: required("Logging", "log_level", logging.log_level)?.parse()?,
        };

        Ok(Config {
            api,
            metrics,
            logging,
        })
    }
}

fn config_path(value: Option<String>) -> PathBuf {
    match value {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

fn missing_section(section: &str) -> AppError {
    AppError::config(format!("Missing required section [{section}]"))
}

fn required(section: &str, key: &str, value: Option<String>) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(AppError::config(format!("{section}.{key} must not be empty"))),
        None => Err(AppError::config(format!("Missing required key {section}.{key}"))),
    }
}

fn parse_integer<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, AppError> {
    value.trim().parse().map_err(|_| {
        AppError::config(format!("{section}.{key} must be an integer, got '{value}'"))
    })
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<u64, AppError> {
    match parse_integer::<u64>(section, key, value)? {
        0 => Err(AppError::config(format!("{section}.{key} must be greater than zero"))),
        n => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[WeatherAPI]
api_key = secret-key
base_url = https://api.openweathermap.org/data/2.5/weather
city = Berlin
country = DE

[Prometheus]
port = 9100
scrape_interval = 60

[Logging]
log_file = logs/weather.log
log_level = INFO
"#;

    #[test]
    fn loads_every_field_from_ini() {
        let cfg = Config::from_ini_str(VALID).unwrap();

        assert_eq!(cfg.api.api_key, "secret-key");
        assert_eq!(
            cfg.api.base_url,
            "https://api.openweathermap.org/data/2.5/weather"
        );
        assert_eq!(cfg.api.city, "Berlin");
        assert_eq!(cfg.api.country, "DE");
        assert_eq!(cfg.api.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
        assert_eq!(cfg.metrics.port, 9100);
        assert_eq!(cfg.metrics.scrape_interval, Duration::from_secs(60));
        assert_eq!(cfg.logging.log_file, PathBuf::from("logs/weather.log"));
        assert_eq!(cfg.logging.log_level, LogLevel::Info);
    }

    #[test]
    fn optional_timeout_is_read_when_present() {
        let ini = VALID.replace("country = DE", "country = DE\ntimeout_seconds = 2");
        let cfg = Config::from_ini_str(&ini).unwrap();
        assert_eq!(cfg.api.timeout, Duration::from_secs(2));
    }

    #[test]
    fn every_required_key_is_enforced() {
        for key in [
            "api_key",
            "base_url",
            "city",
            "country",
            "port",
            "scrape_interval",
            "log_file",
            "log_level",
        ] {
            let ini: String = VALID
                .lines()
                .filter(|line| !line.starts_with(&format!("{key} =")))
                .collect::<Vec<_>>()
                .join("\n");

            let err = Config::from_ini_str(&ini).unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)), "{key}: {err}");
            assert!(err.to_string().contains(key), "{key}: {err}");
        }
    }

    #[test]
    fn missing_section_is_fatal() {
        let ini = VALID.replace("[Logging]", "[Other]");
        let err = Config::from_ini_str(&ini).unwrap_err();
        assert!(err.to_string().contains("[Logging]"));
    }

    #[test]
    fn blank_value_is_rejected() {
        let ini = VALID.replace("city = Berlin", "city =");
        let err = Config::from_ini_str(&ini).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("WeatherAPI.city"));
    }

    #[test]
    fn non_integer_port_is_rejected() {
        let ini = VALID.replace("port = 9100", "port = ninety");
        let err = Config::from_ini_str(&ini).unwrap_err();
        assert!(err.to_string().contains("Prometheus.port must be an integer"));
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        for port in ["0", "70000", "-1"] {
            let ini = VALID.replace("port = 9100", &format!("port = {port}"));
            assert!(Config::from_ini_str(&ini).is_err(), "port {port}");
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        let ini = VALID.replace("scrape_interval = 60", "scrape_interval = 0");
        let err = Config::from_ini_str(&ini).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn log_levels_parse_case_insensitively() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("ERROR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("CRITICAL".parse::<LogLevel>().is_err());
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let cfg = Config::from_ini_str(VALID).unwrap();
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, VALID).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.api.city, "Berlin");
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("absent.ini"));
    }

    #[test]
    fn load_errors_start_with_the_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, VALID.replace("city = Berlin\n", "")).unwrap();

        let err = Config::load(&path).unwrap_err();
        let prefix = format!("Configuration error: {}: ", path.display());
        assert!(err.to_string().starts_with(&prefix), "{err}");
        assert!(err.to_string().contains("WeatherAPI.city"));
    }

    #[test]
    fn config_path_falls_back_to_config_ini() {
        assert_eq!(config_path(None), PathBuf::from("config.ini"));
        assert_eq!(config_path(Some("  ".to_string())), PathBuf::from("config.ini"));
        assert_eq!(
            config_path(Some("/etc/weather/exporter.ini".to_string())),
            PathBuf::from("/etc/weather/exporter.ini")
        );
    }
}
