//! Best-effort delivery of decision records to the external audit sink.
//!
//! The request path only ever enqueues: a detached worker task owns the
//! outbound HTTP call, so a slow or dead sink can never delay a verdict
//! response. `GET /test-log` uses the awaited [`deliver`] path directly to
//! report the sink round-trip outcome.

use std::time::Duration;

use gatehouse_core::record::DecisionRecord;
use tokio::sync::mpsc;
use url::Url;

const SINK_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT_MAX_LEN: usize = 512;
const UNKNOWN: &str = "unknown";

/// Cloneable handle to the audit worker. Dropping all handles shuts the
/// worker down once the queue drains.
#[derive(Clone)]
pub struct AuditLogger {
    tx: mpsc::UnboundedSender<DecisionRecord>,
}

impl AuditLogger {
    /// Spawn the delivery worker and return its handle.
    pub fn spawn(sink_url: Url) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<DecisionRecord>();
        tokio::spawn(async move {
            let client = reqwest::Client::new();
            while let Some(record) = rx.recv().await {
                if let Err(err) = deliver(&client, &sink_url, &record).await {
                    tracing::warn!(
                        error = %err,
                        click_id = %record.click_id,
                        detection_layer = record.detection_layer.as_str(),
                        "audit record delivery failed"
                    );
                }
            }
        });
        Self { tx }
    }

    /// Queue a record for delivery. Never blocks and never fails the caller.
    pub fn emit(&self, record: DecisionRecord) {
        if self.tx.send(record).is_err() {
            tracing::warn!("audit worker gone; decision record dropped");
        }
    }
}

/// One sink round-trip for one record.
pub async fn deliver(
    client: &reqwest::Client,
    sink_url: &Url,
    record: &DecisionRecord,
) -> Result<(), reqwest::Error> {
    client
        .get(sink_url.as_str())
        .query(&sink_params(record))
        .timeout(SINK_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

/// Flatten a record into the sink's column set. Absent values become an
/// explicit "unknown" so every row has the full set of columns.
pub fn sink_params(record: &DecisionRecord) -> Vec<(&'static str, String)> {
    vec![
        ("zoneid", or_unknown(&record.zone_id)),
        ("subzone_id", or_unknown(&record.click_id)),
        ("country", or_unknown(&record.country)),
        ("timestamp", record.decided_at.to_rfc3339()),
        ("user_agent", user_agent_value(record.user_agent.as_deref())),
        ("ip_address", or_unknown(&record.address)),
        (
            "is_bot",
            if record.is_bot { "1" } else { "0" }.to_string(),
        ),
        ("risk_score", record.risk_score.to_string()),
        (
            "detection_layer",
            record.detection_layer.as_str().to_string(),
        ),
        (
            "captcha_score",
            record
                .captcha_score
                .map(|score| score.as_log_value())
                .unwrap_or_else(|| UNKNOWN.to_string()),
        ),
        ("redirect_url", or_unknown(&record.redirect_url)),
    ]
}

fn or_unknown(value: &str) -> String {
    if value.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

fn user_agent_value(user_agent: Option<&str>) -> String {
    match user_agent.map(str::trim).filter(|ua| !ua.is_empty()) {
        Some(ua) => {
            let mut truncated = ua.to_string();
            if truncated.len() > USER_AGENT_MAX_LEN {
                // Stay on a char boundary when cutting.
                let mut cut = USER_AGENT_MAX_LEN;
                while !truncated.is_char_boundary(cut) {
                    cut -= 1;
                }
                truncated.truncate(cut);
            }
            truncated
        }
        None => UNKNOWN.to_string(),
    }
}
