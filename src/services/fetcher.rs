//! HTTP fetch with retry for the stock source.
//!
//! Retries only network-level failures; HTTP error statuses are returned to
//! the caller for inspection.

use crate::error::AppError;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

const POLLER_USER_AGENT: &str = concat!("stock-poller/", env!("CARGO_PKG_VERSION"));

/// Configuration for fetch retry behavior.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Retry attempts after the initial one.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on each subsequent attempt.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    fn backoff_duration(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt)
    }
}

/// HTTP client for the stock source, carrying the optional auth header.
pub struct StockFetcher {
    client: Client,
    auth_header: Option<(String, String)>,
}

impl StockFetcher {
    pub fn new(auth_header: Option<(String, String)>) -> Self {
        Self {
            client: Client::new(),
            auth_header,
        }
    }

    /// GET `url`, retrying connection-level failures per `policy`.
    ///
    /// A response is returned regardless of its status code; only
    /// `reqwest::Error` transport failures are retried.
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        policy: &RetryPolicy,
    ) -> Result<Response, AppError> {
        let mut attempt = 0;

        loop {
            let mut request = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, POLLER_USER_AGENT);
            if let Some((name, value)) = &self.auth_header {
                request = request.header(name.as_str(), value.as_str());
            }

            match request.send().await {
                Ok(response) => {
                    if attempt > 0 {
                        info!(url, attempt = attempt + 1, "fetch succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if attempt >= policy.max_retries {
                        warn!(
                            url,
                            attempt = attempt + 1,
                            error = %err,
                            "fetch failed after max retries"
                        );
                        return Err(err.into());
                    }

                    let backoff = policy.backoff_duration(attempt);
                    warn!(
                        url,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "fetch failed, retrying after backoff"
                    );

                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
