use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use stock_poller::config::PollerConfig;
use stock_poller::startup::Application;
use tokio_util::sync::CancellationToken;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

pub struct TestApp {
    pub address: String,
    shutdown: CancellationToken,
}

impl TestApp {
    pub async fn spawn(config: PollerConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let shutdown = app.shutdown_token();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint.
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp { address, shutdown }
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

/// Config pointing at the given mock endpoints, with a long interval so the
/// background timer stays out of the way unless a test shortens it.
pub fn poller_config(stock_api_url: &str, worker_url: &str) -> PollerConfig {
    PollerConfig {
        port: 0,
        worker_url: worker_url.to_string(),
        stock_api_url: stock_api_url.to_string(),
        stock_fallback_url: None,
        stock_auth_header: None,
        stock_auth_token: None,
        timestamp_field: "reportedAt".to_string(),
        interval: Duration::from_secs(3600),
    }
}

/// Responds with each template in order, repeating the last one once the
/// sequence is exhausted.
pub struct SequenceResponder {
    templates: Vec<ResponseTemplate>,
    next: AtomicUsize,
}

impl SequenceResponder {
    pub fn new(templates: Vec<ResponseTemplate>) -> Self {
        assert!(!templates.is_empty(), "sequence needs at least one response");
        Self {
            templates,
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self
            .next
            .fetch_add(1, Ordering::SeqCst)
            .min(self.templates.len() - 1);
        self.templates[index].clone()
    }
}

pub fn stock_body(reported_at: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "reportedAt": reported_at }))
}

pub async fn requests_to(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .count()
}
