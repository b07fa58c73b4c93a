/// Per-request, per-layer scoring result.
///
/// Scores are additive and unbounded above; `signals` records the reason
/// codes in the order they fired. `is_bot` is the verdict against the
/// producing layer's own threshold; callers combining layers compare the
/// summed score against the pipeline bands instead.
#[derive(Debug, Clone, Default)]
pub struct RiskAssessment {
    pub score: i32,
    pub signals: Vec<String>,
    pub is_bot: bool,
}

impl RiskAssessment {
    pub(crate) fn add(&mut self, weight: i32, signal: &str) {
        self.score += weight;
        self.signals.push(signal.to_string());
    }
}
