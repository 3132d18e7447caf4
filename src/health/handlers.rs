//! Service-discovery health routes.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::http::server::AppState;

/// `GET /sd/health`: the router is up and the middleware chain answers.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// `GET /sd/ready`: 200 once the service has been announced, 503 before.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.started.is_closed() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "STARTING")
    }
}
