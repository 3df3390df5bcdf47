//! Shared building blocks for the weather exporter: the error type, the
//! upstream HTTP client, the weather sample model and log setup.

pub mod errors;
pub mod http_client;
pub mod models;
pub mod tracing;
