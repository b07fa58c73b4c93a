use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Sessions currently held by the visit tracker
    pub active_sessions: usize,
    /// Addresses flagged suspicious since the last reset
    pub suspicious_addresses: usize,
}

/// Liveness check with tracker counters. Read-only: repeating it never
/// mutates tracker state.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let tracker = state.tracker.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: tracker.session_count(),
        suspicious_addresses: tracker.suspicious_count(),
    })
}
