use std::time::Duration;

use serde::Deserialize;

const HCAPTCHA_VERIFY_URL: &str = "https://api.hcaptcha.com/siteverify";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// What the provider said about the visitor. A rejection is a normal
/// pipeline outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptchaOutcome {
    Verified { score: Option<f64> },
    Rejected,
}

/// Transport- or protocol-level failure talking to the provider. The
/// pipeline fails closed on these, under a distinct layer tag from a
/// provider rejection.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("verification endpoint returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Ask the challenge provider whether `token` proves a human. One bounded
/// synchronous call; the caller owns the fail-closed policy.
pub async fn verify_token(
    secret: &str,
    token: &str,
    remote_addr: &str,
) -> Result<CaptchaOutcome, VerifyError> {
    let response = reqwest::Client::new()
        .post(HCAPTCHA_VERIFY_URL)
        .timeout(VERIFY_TIMEOUT)
        .form(&[
            ("secret", secret),
            ("response", token),
            ("remoteip", remote_addr),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(VerifyError::Status(response.status()));
    }

    let verification = response.json::<SiteverifyResponse>().await?;
    Ok(map_siteverify(verification))
}

fn map_siteverify(verification: SiteverifyResponse) -> CaptchaOutcome {
    if verification.success {
        CaptchaOutcome::Verified {
            score: verification.score,
        }
    } else {
        tracing::warn!(
            error_codes = ?verification.error_codes,
            "challenge provider rejected token"
        );
        CaptchaOutcome::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::{CaptchaOutcome, SiteverifyResponse, map_siteverify};

    fn sample(success: bool, score: Option<f64>, error_codes: &[&str]) -> SiteverifyResponse {
        SiteverifyResponse {
            success,
            score,
            error_codes: error_codes.iter().map(|code| code.to_string()).collect(),
        }
    }

    #[test]
    fn successful_verification_carries_the_provider_score() {
        let outcome = map_siteverify(sample(true, Some(0.3), &[]));
        assert_eq!(outcome, CaptchaOutcome::Verified { score: Some(0.3) });
    }

    #[test]
    fn successful_verification_without_score_is_still_verified() {
        let outcome = map_siteverify(sample(true, None, &[]));
        assert_eq!(outcome, CaptchaOutcome::Verified { score: None });
    }

    #[test]
    fn unsuccessful_verification_is_rejected() {
        let outcome = map_siteverify(sample(false, None, &["invalid-input-response"]));
        assert_eq!(outcome, CaptchaOutcome::Rejected);
    }
}
