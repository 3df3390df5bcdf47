//! Prometheus exporter for OpenWeatherMap current conditions.
//!
//! One city is polled on a fixed interval. Each successful response overwrites
//! a set of `weather_*` gauges labeled with the city, served on `/metrics`.
//! Failed polls are logged and leave the previous values in place.

pub mod api_client;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod monitor;
pub mod openapi;
pub mod server;
