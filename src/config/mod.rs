use crate::error::AppError;
use std::env;
use std::time::Duration;

/// Poller configuration, sourced from environment variables at startup.
///
/// `WORKER_URL` and `STOCK_API_URL` have no sensible default and must be
/// set; everything else falls back to a default when absent.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Port for the health HTTP server. Port 0 binds a random port.
    pub port: u16,
    /// Base URL whose `/force-check` path is called on a detected change.
    pub worker_url: String,
    /// Primary stock source URL.
    pub stock_api_url: String,
    /// Alternate source tried once when the primary returns 403.
    pub stock_fallback_url: Option<String>,
    /// Auth header name/value pair, attached only when both are set.
    pub stock_auth_header: Option<String>,
    pub stock_auth_token: Option<String>,
    /// JSON field carrying the change-detection timestamp.
    pub timestamp_field: String,
    /// Poll period.
    pub interval: Duration,
}

impl PollerConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let interval_ms: u64 = get_env("INTERVAL_MS", Some("2000"))?
            .parse()
            .unwrap_or(2000);
        let port: u16 = get_env("PORT", Some("3000"))?.parse().unwrap_or(3000);

        Ok(PollerConfig {
            port,
            worker_url: get_env("WORKER_URL", None)?,
            stock_api_url: get_env("STOCK_API_URL", None)?,
            stock_fallback_url: env::var("STOCK_FALLBACK_URL").ok(),
            stock_auth_header: env::var("STOCK_AUTH_HEADER").ok(),
            stock_auth_token: env::var("STOCK_AUTH_TOKEN").ok(),
            timestamp_field: get_env("STOCK_TIMESTAMP_FIELD", Some("reportedAt"))?,
            interval: Duration::from_millis(interval_ms),
        })
    }

    /// Auth header pair, present only when both name and token are configured.
    pub fn auth_pair(&self) -> Option<(String, String)> {
        match (&self.stock_auth_header, &self.stock_auth_token) {
            (Some(name), Some(token)) => Some((name.clone(), token.clone())),
            _ => None,
        }
    }
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
