use std::sync::Arc;

use common::tracing::init_file_tracing;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use weather_exporter::api_client::OpenWeatherClient;
use weather_exporter::config::Config;
use weather_exporter::metrics::MetricSet;
use weather_exporter::monitor::Monitor;
use weather_exporter::server::MetricsServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging is not up yet; a failure here is reported on stderr by the returned error.
    let config = Config::load(&Config::path_from_env())?;
    init_file_tracing(&config.logging.log_file, config.logging.log_level.into())?;

    info!(
        city = %config.api.city,
        country = %config.api.country,
        port = config.metrics.port,
        interval_secs = config.metrics.scrape_interval.as_secs(),
        "Weather exporter starting"
    );

    let metrics = Arc::new(MetricSet::new(config.api.city.clone())?);
    let client = OpenWeatherClient::new(&config.api)?;

    let server = match MetricsServer::bind(config.metrics.port, metrics.clone()).await {
        Ok(server) => server,
        Err(e) => {
            error!(port = config.metrics.port, error = %e, "Failed to bind metrics server");
            return Err(e.into());
        }
    };

    let cancellation_token = CancellationToken::new();
    let server_task = tokio::spawn(server.serve(cancellation_token.clone()));
    tokio::spawn(shutdown_signal(cancellation_token.clone()));

    Monitor::new(client, metrics, config.metrics.scrape_interval)
        .run(cancellation_token)
        .await;

    server_task.await??;

    info!("Weather exporter stopped");
    Ok(())
}

async fn shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }

    cancellation_token.cancel();
    warn!("Stopping monitor loop and metrics server");
}
