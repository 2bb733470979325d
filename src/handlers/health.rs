use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Liveness probe for the hosting platform. Exposes no internal state.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Catch-all for any other path; the platform only needs a 200.
pub async fn poller_running() -> impl IntoResponse {
    (StatusCode::OK, "Poller running")
}
