//! Application lifecycle: health listener binding and the poller task.

use crate::config::PollerConfig;
use crate::error::AppError;
use crate::handlers::{health_check, poller_running};
use crate::workers::StockPoller;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub struct Application {
    port: u16,
    listener: TcpListener,
    poller: Arc<StockPoller>,
    shutdown_token: CancellationToken,
}

impl Application {
    /// Bind the health listener and set up the poller.
    pub async fn build(config: PollerConfig) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind health listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Health endpoint listening on port {}", port);

        let poller = Arc::new(StockPoller::new(config));

        Ok(Self {
            port,
            listener,
            poller,
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Port the health server is listening on (port 0 = random, for tests).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Handle used to stop both the poller loop and the health server.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Run the health server and the poll loop until the shutdown token is
    /// cancelled.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = Router::new()
            .route("/", get(health_check))
            .route("/health", get(health_check))
            .fallback(poller_running);

        let poller_token = self.shutdown_token.clone();
        let poller = self.poller.clone();
        let poller_task = tokio::spawn(async move {
            poller.run(poller_token).await;
        });

        let server_token = self.shutdown_token.clone();
        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                server_token.cancelled().await;
            })
            .await;

        // The token that stopped the server also stops the poll loop.
        let _ = poller_task.await;

        result
    }
}
