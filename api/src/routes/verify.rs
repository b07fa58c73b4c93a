use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Form, State};
use axum::http::HeaderMap;
use axum::{Json, Router, routing::post};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use gatehouse_core::pipeline::{self, SubmissionGate};
use gatehouse_core::record::{CaptchaScore, DecisionRecord, DetectionLayer};

use crate::error::{AppError, required_param};
use crate::extract::{client_address, header_str};
use crate::hcaptcha::{self, CaptchaOutcome};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/verify", post(verify_submission))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifySubmission {
    /// Token issued by the challenge provider widget
    pub captcha_token: Option<String>,
    pub click_id: Option<String>,
    pub zone_id: Option<String>,
    pub country: Option<String>,
    pub session_id: Option<String>,
    /// Risk total accumulated during the entry request
    pub risk_score: Option<i32>,
    /// Client-computed numeric value proving script execution
    pub js_proof: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub redirect_url: String,
    pub is_bot: bool,
    pub detection_layer: String,
    pub message: String,
}

/// Challenge submission endpoint
///
/// Finalizes a Layer-3 verdict: validates the script-execution proof, then
/// the challenge token, then consults the external verifier. Every path
/// answers 200 with a redirect target; dependency failures resolve to the
/// bot verdict instead of an error status.
#[utoipa::path(
    post,
    path = "/verify",
    request_body(
        content = VerifySubmission,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 200, description = "Final verdict with redirect target", body = VerifyResponse),
        (status = 400, description = "Missing correlation parameters", body = gatehouse_core::error::ApiError)
    ),
    tag = "gate"
)]
pub async fn verify_submission(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(submission): Form<VerifySubmission>,
) -> Result<Json<VerifyResponse>, AppError> {
    let click_id = required_param(submission.click_id, "click_id")?;
    let zone_id = required_param(submission.zone_id, "zone_id")?;
    let country = required_param(submission.country, "country")?;

    let address = client_address(&headers, peer);
    let user_agent = header_str(&headers, "user-agent");
    let risk_score = submission.risk_score.unwrap_or(0);

    let (layer, captcha_score) = match pipeline::gate_submission(
        submission.js_proof.as_deref(),
        submission.captcha_token.as_deref(),
    ) {
        SubmissionGate::JsFailed => (DetectionLayer::Layer3JsFailed, None),
        SubmissionGate::MissingToken => (DetectionLayer::Layer3NoCaptcha, None),
        SubmissionGate::Verify(token) => {
            match hcaptcha::verify_token(&state.config.hcaptcha_secret, token, &address).await {
                Ok(CaptchaOutcome::Verified { score }) => (
                    DetectionLayer::Layer3Success,
                    Some(score.map(CaptchaScore::Provider).unwrap_or(CaptchaScore::Passed)),
                ),
                Ok(CaptchaOutcome::Rejected) => (DetectionLayer::Layer3CaptchaFailed, None),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        address = %address,
                        "challenge verification errored; failing closed"
                    );
                    (DetectionLayer::Layer3Error, None)
                }
            }
        }
    };

    let is_bot = layer.is_bot();
    let redirect_url = if is_bot {
        state.config.bot_redirect_url.as_str()
    } else {
        state.config.human_redirect_url.as_str()
    }
    .to_string();

    state.audit.emit(DecisionRecord {
        click_id,
        zone_id,
        country,
        address,
        user_agent,
        is_bot,
        risk_score,
        detection_layer: layer,
        redirect_url: redirect_url.clone(),
        captcha_score,
        decided_at: Utc::now(),
    });

    Ok(Json(VerifyResponse {
        success: true,
        redirect_url,
        is_bot,
        detection_layer: layer.as_str().to_string(),
        message: outcome_message(layer).to_string(),
    }))
}

fn outcome_message(layer: DetectionLayer) -> &'static str {
    match layer {
        DetectionLayer::Layer3Success => "Verification passed.",
        DetectionLayer::Layer3JsFailed => "Script execution proof was invalid.",
        DetectionLayer::Layer3NoCaptcha => "Challenge token was missing.",
        DetectionLayer::Layer3CaptchaFailed => "Challenge verification failed.",
        DetectionLayer::Layer3Error => "Challenge verification was unavailable.",
        _ => "Verdict recorded.",
    }
}

#[cfg(test)]
mod tests {
    use super::outcome_message;
    use gatehouse_core::record::DetectionLayer;

    #[test]
    fn every_submission_layer_has_a_message() {
        for layer in [
            DetectionLayer::Layer3Success,
            DetectionLayer::Layer3JsFailed,
            DetectionLayer::Layer3NoCaptcha,
            DetectionLayer::Layer3CaptchaFailed,
            DetectionLayer::Layer3Error,
        ] {
            assert!(!outcome_message(layer).is_empty());
        }
    }
}
