use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Router, routing::get};
use chrono::Utc;
use serde::Deserialize;

use gatehouse_core::pipeline::{self, TotalBand};
use gatehouse_core::record::{CaptchaScore, DecisionRecord, DetectionLayer};
use gatehouse_core::signals;
use gatehouse_core::tracker;

use crate::error::{AppError, required_param};
use crate::extract::{client_address, client_hello, header_str};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(entry))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct EntryQuery {
    /// Click correlation id from the traffic source
    #[serde(rename = "ClickId")]
    pub click_id: Option<String>,
    /// Zone correlation id from the traffic source
    #[serde(rename = "ZonaId")]
    pub zona_id: Option<String>,
    /// Two-letter country code reported by the traffic source
    #[serde(rename = "Country")]
    pub country: Option<String>,
    /// Optional client-supplied session identifier
    pub sid: Option<String>,
}

/// Entry point for inbound clicks
///
/// Scores the request through Layers 1 and 2 and either redirects
/// immediately (conclusive verdict or low risk) or serves the interactive
/// challenge page.
#[utoipa::path(
    get,
    path = "/",
    params(EntryQuery),
    responses(
        (status = 307, description = "Conclusive verdict; redirect to the matching destination"),
        (status = 200, description = "Ambiguous risk; interactive challenge page", content_type = "text/html"),
        (status = 400, description = "Missing correlation parameters", body = gatehouse_core::error::ApiError)
    ),
    tag = "gate"
)]
pub async fn entry(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<EntryQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    // Correlation params are validated before any scoring or logging runs.
    let click_id = required_param(query.click_id, "ClickId")?;
    let zone_id = required_param(query.zona_id, "ZonaId")?;
    let country = required_param(query.country, "Country")?;

    let address = client_address(&headers, peer);
    let user_agent = header_str(&headers, "user-agent");
    let hello = client_hello(&headers, &address);
    let now = Utc::now();

    let mut visits = state.tracker.write().await;

    let layer1 = signals::evaluate_client_hello(&hello, visits.suspicious_addresses());
    if layer1.is_bot {
        drop(visits);
        tracing::info!(
            address = %address,
            score = layer1.score,
            signals = ?layer1.signals,
            "blocked at layer 1"
        );
        return Ok(finalize_entry(
            &state,
            EntryContext {
                click_id,
                zone_id,
                country,
                address,
                user_agent,
            },
            DetectionLayer::Layer1,
            layer1.score,
            None,
        ));
    }

    let session_key = query
        .sid
        .map(|sid| sid.trim().to_string())
        .filter(|sid| !sid.is_empty())
        .unwrap_or_else(|| tracker::derive_session_key(&address, now));
    let layer2 = visits.record_and_score(&session_key, &address, now);
    drop(visits);

    let total = layer1.score + layer2.score;
    let ctx = EntryContext {
        click_id,
        zone_id,
        country,
        address,
        user_agent,
    };

    match pipeline::classify_total(total) {
        TotalBand::Block => {
            tracing::info!(
                address = %ctx.address,
                total,
                signals = ?layer2.signals,
                "blocked at layer 2"
            );
            Ok(finalize_entry(&state, ctx, DetectionLayer::Layer2, total, None))
        }
        TotalBand::LowRisk => Ok(finalize_entry(
            &state,
            ctx,
            DetectionLayer::Layer3LowRisk,
            total,
            Some(CaptchaScore::BypassedLowRisk),
        )),
        TotalBand::Challenge => Ok(Html(challenge_page(
            &state.config.hcaptcha_site_key,
            &ctx,
            &session_key,
            total,
        ))
        .into_response()),
    }
}

struct EntryContext {
    click_id: String,
    zone_id: String,
    country: String,
    address: String,
    user_agent: Option<String>,
}

/// Terminal entry outcome: one decision record, one audit emission, one
/// redirect.
fn finalize_entry(
    state: &AppState,
    ctx: EntryContext,
    layer: DetectionLayer,
    risk_score: i32,
    captcha_score: Option<CaptchaScore>,
) -> Response {
    let is_bot = layer.is_bot();
    let redirect_url = if is_bot {
        state.config.bot_redirect_url.as_str()
    } else {
        state.config.human_redirect_url.as_str()
    }
    .to_string();

    state.audit.emit(DecisionRecord {
        click_id: ctx.click_id,
        zone_id: ctx.zone_id,
        country: ctx.country,
        address: ctx.address,
        user_agent: ctx.user_agent,
        is_bot,
        risk_score,
        detection_layer: layer,
        redirect_url: redirect_url.clone(),
        captcha_score,
        decided_at: Utc::now(),
    });

    Redirect::temporary(&redirect_url).into_response()
}

/// The interactive challenge page. Submission stays disabled until the page
/// has both a computed numeric proof and a challenge token.
fn challenge_page(site_key: &str, ctx: &EntryContext, session_key: &str, total: i32) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title></title>
    <script src="https://js.hcaptcha.com/1/api.js" async defer></script>
    <style>
        body {{
            margin: 0;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            background: transparent;
        }}
    </style>
</head>
<body>
    <form id="challengeForm">
        <input type="hidden" name="click_id" value="{click_id}">
        <input type="hidden" name="zone_id" value="{zone_id}">
        <input type="hidden" name="country" value="{country}">
        <input type="hidden" name="session_id" value="{session_key}">
        <input type="hidden" name="risk_score" value="{total}">
        <div class="h-captcha" data-sitekey="{site_key}" data-callback="onChallengeToken"></div>
    </form>

    <script>
        let jsProof = null;
        let challengeToken = null;

        // Numeric proof that a script engine actually ran the page.
        (function () {{
            let value = 0;
            for (let i = 0; i < 100000; i++) {{
                value = (value + i) % 4001;
            }}
            jsProof = 500 + value;
        }})();

        function onChallengeToken(token) {{
            challengeToken = token;
            submitChallenge();
        }}

        function submitChallenge() {{
            if (jsProof === null || challengeToken === null) {{
                return;
            }}
            const body = new URLSearchParams(new FormData(document.getElementById('challengeForm')));
            body.append('captcha_token', challengeToken);
            body.append('js_proof', String(jsProof));

            fetch('/verify', {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/x-www-form-urlencoded' }},
                body: body
            }})
            .then(response => response.json())
            .then(data => {{
                if (data.success) {{
                    window.location.href = data.redirectUrl;
                }}
            }})
            .catch(() => {{
                if (window.hcaptcha) {{
                    hcaptcha.reset();
                }}
            }});
        }}
    </script>
</body>
</html>"#,
        click_id = escape_attr(&ctx.click_id),
        zone_id = escape_attr(&ctx.zone_id),
        country = escape_attr(&ctx.country),
        session_key = escape_attr(session_key),
        total = total,
        site_key = escape_attr(site_key),
    )
}

/// Minimal HTML attribute escaping for values echoed into the page.
fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{EntryContext, challenge_page, escape_attr};

    #[test]
    fn escape_attr_neutralizes_markup() {
        assert_eq!(
            escape_attr(r#""><script>alert(1)</script>"#),
            "&quot;&gt;&lt;script&gt;alert(1)&lt;/script&gt;"
        );
        assert_eq!(escape_attr("plain-id_123"), "plain-id_123");
    }

    #[test]
    fn challenge_page_carries_the_correlation_state() {
        let ctx = EntryContext {
            click_id: "click-1".to_string(),
            zone_id: "zone-9".to_string(),
            country: "ID".to_string(),
            address: "203.0.113.7".to_string(),
            user_agent: None,
        };
        let page = challenge_page("site-key-1", &ctx, "sess-abc", 45);
        assert!(page.contains(r#"name="click_id" value="click-1""#));
        assert!(page.contains(r#"name="session_id" value="sess-abc""#));
        assert!(page.contains(r#"name="risk_score" value="45""#));
        assert!(page.contains(r#"data-sitekey="site-key-1""#));
    }

    #[test]
    fn challenge_page_escapes_injected_parameters() {
        let ctx = EntryContext {
            click_id: r#""><script>"#.to_string(),
            zone_id: "z".to_string(),
            country: "ID".to_string(),
            address: "203.0.113.7".to_string(),
            user_agent: None,
        };
        let page = challenge_page("site-key-1", &ctx, "sess", 45);
        assert!(!page.contains("\"><script>"));
    }
}
