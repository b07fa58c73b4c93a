//! Decision pipeline transitions.
//!
//! The pure half of the state machine: band classification for the entry
//! request and the submission gate for the challenge form. The api handlers
//! own the side-effecting half (tracker updates, the verifier call, audit
//! emission) and consult these functions between steps.

pub const COMBINED_BLOCK_THRESHOLD: i32 = 100;
pub const LOW_RISK_THRESHOLD: i32 = 30;
pub const JS_PROOF_MIN: i64 = 500;
pub const JS_PROOF_MAX: i64 = 5000;

/// Outcome of the Layer-1 + Layer-2 combined score for an entry request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalBand {
    /// Combined score left no doubt; block without challenging.
    Block,
    /// Too little risk accumulated to be worth challenging.
    LowRisk,
    /// Ambiguous; escalate to the interactive challenge.
    Challenge,
}

pub fn classify_total(total: i32) -> TotalBand {
    if total >= COMBINED_BLOCK_THRESHOLD {
        TotalBand::Block
    } else if total < LOW_RISK_THRESHOLD {
        TotalBand::LowRisk
    } else {
        TotalBand::Challenge
    }
}

/// True when the client-computed value parses as an integer inside the
/// accepted window. Anything absent, unparseable, or out of range is
/// treated as a failed script-execution proof.
pub fn evaluate_js_proof(raw: Option<&str>) -> bool {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .is_some_and(|value| (JS_PROOF_MIN..=JS_PROOF_MAX).contains(&value))
}

/// How a challenge submission proceeds before the external verifier is
/// consulted. The script-execution proof is checked first; a missing token
/// only matters once the proof holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionGate<'a> {
    JsFailed,
    MissingToken,
    Verify(&'a str),
}

pub fn gate_submission<'a>(
    js_proof: Option<&str>,
    captcha_token: Option<&'a str>,
) -> SubmissionGate<'a> {
    if !evaluate_js_proof(js_proof) {
        return SubmissionGate::JsFailed;
    }
    match captcha_token.map(str::trim).filter(|token| !token.is_empty()) {
        Some(token) => SubmissionGate::Verify(token),
        None => SubmissionGate::MissingToken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_at_or_above_one_hundred_block() {
        assert_eq!(classify_total(100), TotalBand::Block);
        assert_eq!(classify_total(170), TotalBand::Block);
    }

    #[test]
    fn totals_under_thirty_approve_without_challenge() {
        assert_eq!(classify_total(0), TotalBand::LowRisk);
        assert_eq!(classify_total(29), TotalBand::LowRisk);
    }

    #[test]
    fn ambiguous_totals_escalate_to_the_challenge() {
        assert_eq!(classify_total(30), TotalBand::Challenge);
        assert_eq!(classify_total(65), TotalBand::Challenge);
        assert_eq!(classify_total(99), TotalBand::Challenge);
    }

    #[test]
    fn js_proof_window_is_inclusive() {
        assert!(evaluate_js_proof(Some("500")));
        assert!(evaluate_js_proof(Some("4999")));
        assert!(evaluate_js_proof(Some("5000")));
        assert!(!evaluate_js_proof(Some("499")));
        assert!(!evaluate_js_proof(Some("5001")));
        assert!(!evaluate_js_proof(Some("10")));
    }

    #[test]
    fn js_proof_rejects_garbage_and_absence() {
        assert!(!evaluate_js_proof(None));
        assert!(!evaluate_js_proof(Some("")));
        assert!(!evaluate_js_proof(Some("abc")));
        assert!(!evaluate_js_proof(Some("12.5")));
    }

    #[test]
    fn js_proof_tolerates_surrounding_whitespace() {
        assert!(evaluate_js_proof(Some(" 1234 ")));
    }

    #[test]
    fn js_failure_wins_over_missing_token() {
        assert_eq!(gate_submission(Some("10"), None), SubmissionGate::JsFailed);
        assert_eq!(
            gate_submission(None, Some("token")),
            SubmissionGate::JsFailed
        );
    }

    #[test]
    fn valid_proof_without_token_is_missing_token() {
        assert_eq!(
            gate_submission(Some("4999"), None),
            SubmissionGate::MissingToken
        );
        assert_eq!(
            gate_submission(Some("4999"), Some("   ")),
            SubmissionGate::MissingToken
        );
    }

    #[test]
    fn valid_proof_with_token_reaches_the_verifier() {
        assert_eq!(
            gate_submission(Some("4999"), Some("tok-1")),
            SubmissionGate::Verify("tok-1")
        );
    }
}
