use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api_client::WeatherSource;
use crate::metrics::MetricSet;

/// Fetch, publish, sleep, repeat.
///
/// Exactly one fetch is in flight at a time. The interval is measured from the
/// end of one cycle to the start of the next, so a slow provider stretches the
/// period instead of overlapping cycles.
pub struct Monitor<S> {
    source: S,
    metrics: Arc<MetricSet>,
    interval: Duration,
}

impl<S: WeatherSource> Monitor<S> {
    pub fn new(source: S, metrics: Arc<MetricSet>, interval: Duration) -> Self {
        Self {
            source,
            metrics,
            interval,
        }
    }

    /// Run one cycle. Returns whether a sample was published.
    pub async fn run_cycle(&self) -> bool {
        match self.source.fetch_once().await {
            Some(sample) => {
                info!(city = %self.metrics.city(), ?sample, "Weather data fetched");
                self.metrics.publish(&sample).await;
                true
            }
            None => {
                warn!(city = %self.metrics.city(), "Cycle produced no weather data");
                false
            }
        }
    }

    /// Run cycles until `cancel` fires. Cancellation is observed while sleeping
    /// and while a fetch is in flight.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            city = %self.metrics.city(),
            interval_secs = self.interval.as_secs(),
            "Monitor loop running"
        );

        loop {
            tokio::select! {
                _ = self.run_cycle() => {}
                _ = cancel.cancelled() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        info!("Monitor loop stopped");
    }
}
