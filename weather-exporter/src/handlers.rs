use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
};
use common::errors::AppError;
use common::models::HealthResponse;
use std::sync::Arc;
use tracing::debug;

use crate::metrics::{CONTENT_TYPE, MetricSet};

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricSet>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Exporter health check", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "weather-exporter".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (
            status = 200,
            description = "Current weather gauges in Prometheus text format",
            body = String,
            content_type = "text/plain"
        ),
        (status = 500, description = "Metrics could not be encoded")
    ),
    tag = "metrics"
)]
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render().await?;
    debug!(city = %state.metrics.city(), bytes = body.len(), "Serving scrape");

    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body))
}
