use chrono::{DateTime, Utc};

/// Pipeline stage at which a verdict became final. `as_str()` values are the
/// wire tags carried in `/verify` responses and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionLayer {
    Layer1,
    Layer2,
    Layer3LowRisk,
    Layer3JsFailed,
    Layer3NoCaptcha,
    Layer3CaptchaFailed,
    Layer3Success,
    Layer3Error,
}

impl DetectionLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionLayer::Layer1 => "Layer1",
            DetectionLayer::Layer2 => "Layer2",
            DetectionLayer::Layer3LowRisk => "Layer3-LowRisk",
            DetectionLayer::Layer3JsFailed => "Layer3-JSFailed",
            DetectionLayer::Layer3NoCaptcha => "Layer3-NoCaptcha",
            DetectionLayer::Layer3CaptchaFailed => "Layer3-CaptchaFailed",
            DetectionLayer::Layer3Success => "Layer3-Success",
            DetectionLayer::Layer3Error => "Layer3-Error",
        }
    }

    /// Every terminal layer maps to exactly one verdict; only a low-risk
    /// approval or a passed challenge counts as human.
    pub fn is_bot(self) -> bool {
        !matches!(
            self,
            DetectionLayer::Layer3LowRisk | DetectionLayer::Layer3Success
        )
    }
}

/// Verification sub-score from the interactive challenge, distinct from the
/// pipeline's own risk score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptchaScore {
    /// Confidence value returned by the challenge provider.
    Provider(f64),
    /// Provider confirmed the challenge but supplied no score.
    Passed,
    /// Challenge skipped because the accumulated risk stayed under the
    /// low-risk band.
    BypassedLowRisk,
}

impl CaptchaScore {
    pub fn as_log_value(self) -> String {
        match self {
            CaptchaScore::Provider(score) => score.to_string(),
            CaptchaScore::Passed => "passed".to_string(),
            CaptchaScore::BypassedLowRisk => "bypassed-low-risk".to_string(),
        }
    }
}

/// Terminal per-request outcome handed to the audit logger. Built exactly
/// once per request and not retained in-process afterwards.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub click_id: String,
    pub zone_id: String,
    pub country: String,
    pub address: String,
    pub user_agent: Option<String>,
    pub is_bot: bool,
    pub risk_score: i32,
    pub detection_layer: DetectionLayer,
    pub redirect_url: String,
    pub captcha_score: Option<CaptchaScore>,
    pub decided_at: DateTime<Utc>,
}
