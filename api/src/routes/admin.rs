use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use gatehouse_core::record::{CaptchaScore, DecisionRecord, DetectionLayer};

use crate::audit;
use crate::config::GateConfig;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/reset-suspicious", post(reset_suspicious))
        .route("/test-log", get(test_log))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ResetResponse {
    pub success: bool,
    pub sessions_cleared: usize,
    pub addresses_cleared: usize,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TestLogResponse {
    pub success: bool,
    pub message: String,
}

/// Clear the visit tracker and flagged-address set
///
/// Requires the admin bearer token; deployments without one have the
/// endpoint disabled. Safe to repeat: a second reset clears nothing and
/// still succeeds.
#[utoipa::path(
    post,
    path = "/admin/reset-suspicious",
    responses(
        (status = 200, description = "Store cleared", body = ResetResponse),
        (status = 403, description = "Missing or wrong admin token", body = gatehouse_core::error::ApiError),
        (status = 503, description = "Admin interface not configured", body = gatehouse_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn reset_suspicious(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ResetResponse>, AppError> {
    require_admin(&state.config, &headers)?;

    let mut tracker = state.tracker.write().await;
    let (sessions_cleared, addresses_cleared) = tracker.reset();
    drop(tracker);

    tracing::info!(sessions_cleared, addresses_cleared, "visit tracker reset");
    Ok(Json(ResetResponse {
        success: true,
        sessions_cleared,
        addresses_cleared,
    }))
}

/// Push a synthetic decision record through the audit sink
///
/// Unlike the request path this awaits the sink round-trip, so operators
/// can see delivery failures directly.
#[utoipa::path(
    get,
    path = "/test-log",
    responses(
        (status = 200, description = "Sink round-trip outcome", body = TestLogResponse)
    ),
    tag = "admin"
)]
pub async fn test_log(State(state): State<AppState>) -> Json<TestLogResponse> {
    let record = DecisionRecord {
        click_id: format!("TEST_{}", uuid::Uuid::now_v7()),
        zone_id: "TEST_ZONE".to_string(),
        country: "ID".to_string(),
        address: "127.0.0.1".to_string(),
        user_agent: Some("gatehouse-test-agent".to_string()),
        is_bot: false,
        risk_score: 0,
        detection_layer: DetectionLayer::Layer3Success,
        redirect_url: state.config.human_redirect_url.as_str().to_string(),
        captcha_score: Some(CaptchaScore::Passed),
        decided_at: Utc::now(),
    };

    match audit::deliver(
        &reqwest::Client::new(),
        &state.config.audit_sink_url,
        &record,
    )
    .await
    {
        Ok(()) => Json(TestLogResponse {
            success: true,
            message: "Audit sink round-trip completed.".to_string(),
        }),
        Err(err) => {
            tracing::warn!(error = %err, "audit sink test delivery failed");
            Json(TestLogResponse {
                success: false,
                message: format!("Audit sink delivery failed: {err}"),
            })
        }
    }
}

fn require_admin(config: &GateConfig, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = config.admin_token.as_deref() else {
        return Err(AppError::ServiceUnavailable {
            message: "Admin interface is not configured.".to_string(),
        });
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match provided {
        Some(token) if token == expected => Ok(()),
        _ => Err(AppError::Forbidden {
            message: "Admin token required.".to_string(),
            docs_hint: Some("Send the configured token as a bearer Authorization header.".to_string()),
        }),
    }
}
