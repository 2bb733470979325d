//! Change-detection loop.
//!
//! Polls the stock source on a fixed interval, compares the reported
//! timestamp to the last observed value, and calls the downstream
//! `/force-check` webhook when it changes. In-flight guards keep overlapping
//! ticks and overlapping triggers from double-firing.

use crate::config::PollerConfig;
use crate::error::AppError;
use crate::models::StockSnapshot;
use crate::services::{RetryPolicy, StockFetcher};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const BACKOFF_BASE: Duration = Duration::from_millis(300);
const PRIMARY_RETRIES: u32 = 2;
const FALLBACK_RETRIES: u32 = 1;

/// Process-wide detector state. Lives for the process lifetime, never
/// persisted.
struct PollerState {
    last_seen: Mutex<Option<i64>>,
    fetch_in_flight: AtomicBool,
    trigger_in_flight: AtomicBool,
}

pub struct StockPoller {
    config: PollerConfig,
    fetcher: StockFetcher,
    client: reqwest::Client,
    state: PollerState,
}

impl StockPoller {
    pub fn new(config: PollerConfig) -> Self {
        let fetcher = StockFetcher::new(config.auth_pair());

        Self {
            config,
            fetcher,
            client: reqwest::Client::new(),
            state: PollerState {
                last_seen: Mutex::new(None),
                fetch_in_flight: AtomicBool::new(false),
                trigger_in_flight: AtomicBool::new(false),
            },
        }
    }

    /// Drive poll cycles on the configured interval until cancelled.
    ///
    /// Each tick spawns its own cycle task; the `fetch_in_flight` guard is
    /// what keeps a slow cycle from stacking up behind the timer.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            stock_api_url = %self.config.stock_api_url,
            "starting stock poller"
        );

        let mut ticker = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("stock poller shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let poller = self.clone();
                    tokio::spawn(async move {
                        poller.poll_once().await;
                    });
                }
            }
        }
    }

    /// One fetch-and-compare pass. No-op when a cycle is already running.
    pub async fn poll_once(&self) {
        if self
            .state
            .fetch_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        if let Err(err) = self.poll_cycle().await {
            error!(error = %err, "poll cycle failed");
        }

        self.state.fetch_in_flight.store(false, Ordering::SeqCst);
    }

    /// Last observed timestamp, `None` until the first successful fetch.
    pub async fn last_seen(&self) -> Option<i64> {
        *self.state.last_seen.lock().await
    }

    async fn poll_cycle(&self) -> Result<(), AppError> {
        let policy = RetryPolicy::new(PRIMARY_RETRIES, BACKOFF_BASE);
        let response = self
            .fetcher
            .fetch_with_retry(&self.config.stock_api_url, &policy)
            .await?;

        let body = if response.status().is_success() {
            response.json().await?
        } else {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<non-text body>".to_string());
            warn!(status = %status, body = %body_text, "stock api returned error status");

            let fallback_url = match &self.config.stock_fallback_url {
                Some(url) if status == StatusCode::FORBIDDEN => url,
                _ => return Ok(()),
            };

            info!(url = %fallback_url, "attempting fallback stock url");
            let fallback_policy = RetryPolicy::new(FALLBACK_RETRIES, BACKOFF_BASE);
            let fallback = self
                .fetcher
                .fetch_with_retry(fallback_url, &fallback_policy)
                .await?;

            if fallback.status().is_success() {
                fallback.json().await?
            } else {
                let status = fallback.status();
                let body_text = fallback
                    .text()
                    .await
                    .unwrap_or_else(|_| "<non-text body>".to_string());
                warn!(status = %status, body = %body_text, "fallback returned error status");
                return Ok(());
            }
        };

        let snapshot = StockSnapshot::from_value(&body, &self.config.timestamp_field);
        self.handle_snapshot(snapshot).await;
        Ok(())
    }

    async fn handle_snapshot(&self, snapshot: StockSnapshot) {
        let Some(reported_at) = snapshot.reported_at else {
            return;
        };

        let last_seen = *self.state.last_seen.lock().await;
        match last_seen {
            Some(previous) if previous != reported_at => {
                info!(from = previous, to = reported_at, "detected timestamp change");

                if self
                    .state
                    .trigger_in_flight
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    // Advance the state before the webhook call completes so
                    // a concurrent cycle cannot re-trigger on the same value.
                    *self.state.last_seen.lock().await = Some(reported_at);
                    self.trigger_force_check().await;
                    self.state.trigger_in_flight.store(false, Ordering::SeqCst);
                } else {
                    info!("force-check already in flight, skipping duplicate trigger");
                }
            }
            Some(_) => {}
            None => {
                info!(reported_at, "initial timestamp observed");
            }
        }

        *self.state.last_seen.lock().await = Some(reported_at);
    }

    async fn trigger_force_check(&self) {
        let url = format!(
            "{}/force-check",
            self.config.worker_url.trim_end_matches('/')
        );

        match self.client.get(&url).send().await {
            Ok(response) => {
                info!(status = %response.status(), "force-check completed");
            }
            Err(err) => {
                error!(error = %err, "force-check call failed");
            }
        }
    }
}
