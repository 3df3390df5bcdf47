use crate::errors::AppError;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP client with a bounded request timeout.
///
/// Every request is attempted exactly once. Callers that want another try wait
/// for their next scheduled cycle.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `url` with the given query parameters and return the body of a 2xx response.
    ///
    /// Errors never carry the full request URL, since query parameters may hold credentials.
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, AppError> {
        let request = async {
            let response = self.client.get(url).query(query).send().await?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::http(
                    status.as_u16(),
                    format!("HTTP error: {}", status),
                ));
            }

            let body = response.text().await?;
            Ok::<String, AppError>(body)
        };

        let body = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| self.timed_out(url))?
            .map_err(|e| match e {
                AppError::NetworkError(e) if e.is_timeout() => self.timed_out(url),
                AppError::NetworkError(e) => AppError::NetworkError(e.without_url()),
                other => other,
            })?;

        debug!(url = %url, bytes = body.len(), "Request successful");
        Ok(body)
    }

    fn timed_out(&self, url: &str) -> AppError {
        AppError::timeout(format!(
            "Request to {} timed out after {}ms",
            url,
            self.timeout.as_millis()
        ))
    }
}
