use axum::{Router, routing::get};
use common::errors::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{self, AppState};
use crate::metrics::MetricSet;
use crate::openapi;

pub fn router(metrics: Arc<MetricSet>) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { metrics })
}

/// HTTP listener exposing the metric set to scrapers.
pub struct MetricsServer {
    listener: TcpListener,
    metrics: Arc<MetricSet>,
}

impl MetricsServer {
    /// Bind `0.0.0.0:port`. A port already in use is an error, not a retry.
    pub async fn bind(port: u16, metrics: Arc<MetricSet>) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, metrics })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve scrapes until `shutdown` is cancelled.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), AppError> {
        let addr = self.local_addr()?;
        info!("Metrics server listening on {}", addr);

        axum::serve(self.listener, router(self.metrics))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Metrics server stopped");
        Ok(())
    }
}
