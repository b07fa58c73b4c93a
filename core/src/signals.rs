use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{RegexSet, RegexSetBuilder};

use crate::assessment::RiskAssessment;

pub const MISSING_USER_AGENT_WEIGHT: i32 = 50;
pub const BOT_SIGNATURE_WEIGHT: i32 = 80;
pub const NONSTANDARD_USER_AGENT_WEIGHT: i32 = 30;
pub const NO_HTML_ACCEPT_WEIGHT: i32 = 20;
pub const MISSING_ACCEPT_LANGUAGE_WEIGHT: i32 = 15;
pub const MISSING_ACCEPT_ENCODING_WEIGHT: i32 = 15;
pub const AUTOMATION_HEADER_WEIGHT: i32 = 60;
pub const FLAGGED_ADDRESS_WEIGHT: i32 = 40;
pub const LAYER1_BOT_THRESHOLD: i32 = 70;

/// Headers conventionally injected by scripted HTTP clients and browser
/// automation shims. Presence of any of them is a strong signal on its own.
pub const AUTOMATION_MARKER_HEADERS: &[&str] = &[
    "x-automation",
    "x-selenium",
    "x-puppeteer",
    "x-playwright",
    "x-headless",
    "x-crawler",
];

/// User-agent fragments of known crawlers and automation tooling.
static BOT_SIGNATURES: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSetBuilder::new([
        r"bot\b",
        r"crawl",
        r"spider",
        r"scrape",
        r"scrapy",
        r"curl/",
        r"wget/",
        r"python-requests",
        r"python-urllib",
        r"aiohttp",
        r"go-http-client",
        r"okhttp",
        r"java/",
        r"libwww",
        r"httpclient",
        r"node-fetch",
        r"axios/",
        r"phantomjs",
        r"headlesschrome",
        r"selenium",
        r"puppeteer",
        r"playwright",
    ])
    .case_insensitive(true)
    .build()
    .expect("valid bot signature patterns")
});

/// Tokens present in every mainstream browser user-agent string.
static KNOWN_BROWSERS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSetBuilder::new([
        r"mozilla",
        r"chrome",
        r"safari",
        r"firefox",
        r"edg",
        r"opera",
        r"trident",
        r"msie",
    ])
    .case_insensitive(true)
    .build()
    .expect("valid browser patterns")
});

/// Static request signals the api layer lifts out of the HTTP headers and
/// socket address, keeping this crate free of any framework types.
#[derive(Debug, Clone, Default)]
pub struct ClientHello {
    pub user_agent: Option<String>,
    pub accept: Option<String>,
    pub accept_language: Option<String>,
    pub accept_encoding: Option<String>,
    pub automation_marker: bool,
    pub origin: String,
}

/// Layer-1 scorer: purely static signal inspection, no per-session state
/// beyond a read of the flagged-address set.
pub fn evaluate_client_hello(
    hello: &ClientHello,
    suspicious: &HashSet<String>,
) -> RiskAssessment {
    let mut assessment = RiskAssessment::default();

    match hello.user_agent.as_deref().map(str::trim) {
        None | Some("") => {
            assessment.add(MISSING_USER_AGENT_WEIGHT, "missing-user-agent");
        }
        Some(user_agent) => {
            if BOT_SIGNATURES.is_match(user_agent) {
                // A signature hit is conclusive; the browser check would only
                // double-count the same string.
                assessment.add(BOT_SIGNATURE_WEIGHT, "bot-signature");
            } else if !KNOWN_BROWSERS.is_match(user_agent) {
                assessment.add(NONSTANDARD_USER_AGENT_WEIGHT, "nonstandard-user-agent");
            }
        }
    }

    if !accepts_html(hello.accept.as_deref()) {
        assessment.add(NO_HTML_ACCEPT_WEIGHT, "no-html-accept");
    }
    if is_absent(hello.accept_language.as_deref()) {
        assessment.add(MISSING_ACCEPT_LANGUAGE_WEIGHT, "missing-accept-language");
    }
    if is_absent(hello.accept_encoding.as_deref()) {
        assessment.add(MISSING_ACCEPT_ENCODING_WEIGHT, "missing-accept-encoding");
    }
    if hello.automation_marker {
        assessment.add(AUTOMATION_HEADER_WEIGHT, "automation-header");
    }
    if suspicious.contains(&hello.origin) {
        assessment.add(FLAGGED_ADDRESS_WEIGHT, "flagged-address");
    }

    assessment.is_bot = assessment.score >= LAYER1_BOT_THRESHOLD;
    assessment
}

fn accepts_html(accept: Option<&str>) -> bool {
    accept.is_some_and(|value| value.contains("text/html") || value.contains("*/*"))
}

fn is_absent(value: Option<&str>) -> bool {
    value.map(str::trim).is_none_or(str::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/120.0.0.0 Safari/537.36";

    fn browser_hello() -> ClientHello {
        ClientHello {
            user_agent: Some(BROWSER_UA.to_string()),
            accept: Some("text/html,application/xhtml+xml".to_string()),
            accept_language: Some("en-US,en;q=0.9".to_string()),
            accept_encoding: Some("gzip, deflate, br".to_string()),
            automation_marker: false,
            origin: "203.0.113.7".to_string(),
        }
    }

    #[test]
    fn clean_browser_request_scores_zero() {
        let assessment = evaluate_client_hello(&browser_hello(), &HashSet::new());
        assert_eq!(assessment.score, 0);
        assert!(assessment.signals.is_empty());
        assert!(!assessment.is_bot);
    }

    #[test]
    fn missing_user_agent_alone_stays_under_threshold() {
        let hello = ClientHello {
            user_agent: None,
            ..browser_hello()
        };
        let assessment = evaluate_client_hello(&hello, &HashSet::new());
        assert_eq!(assessment.score, MISSING_USER_AGENT_WEIGHT);
        assert_eq!(assessment.signals, vec!["missing-user-agent"]);
        assert!(!assessment.is_bot);
    }

    #[test]
    fn bot_signature_crosses_threshold_on_its_own() {
        let hello = ClientHello {
            user_agent: Some("python-requests/2.31.0".to_string()),
            ..browser_hello()
        };
        let assessment = evaluate_client_hello(&hello, &HashSet::new());
        assert_eq!(assessment.score, BOT_SIGNATURE_WEIGHT);
        assert!(assessment.is_bot);
    }

    #[test]
    fn bot_signature_short_circuits_browser_check() {
        // "HeadlessChrome" matches both pattern sets; only the signature
        // weight may fire.
        let hello = ClientHello {
            user_agent: Some("Mozilla/5.0 HeadlessChrome/120.0".to_string()),
            ..browser_hello()
        };
        let assessment = evaluate_client_hello(&hello, &HashSet::new());
        assert_eq!(assessment.signals, vec!["bot-signature"]);
        assert_eq!(assessment.score, BOT_SIGNATURE_WEIGHT);
    }

    #[test]
    fn unrecognized_user_agent_is_penalized_but_not_conclusive() {
        let hello = ClientHello {
            user_agent: Some("MyCustomClient/1.0".to_string()),
            ..browser_hello()
        };
        let assessment = evaluate_client_hello(&hello, &HashSet::new());
        assert_eq!(assessment.score, NONSTANDARD_USER_AGENT_WEIGHT);
        assert_eq!(assessment.signals, vec!["nonstandard-user-agent"]);
        assert!(!assessment.is_bot);
    }

    #[test]
    fn each_missing_header_adds_its_weight() {
        let hello = ClientHello {
            accept: None,
            accept_language: None,
            accept_encoding: None,
            ..browser_hello()
        };
        let assessment = evaluate_client_hello(&hello, &HashSet::new());
        assert_eq!(
            assessment.score,
            NO_HTML_ACCEPT_WEIGHT + MISSING_ACCEPT_LANGUAGE_WEIGHT + MISSING_ACCEPT_ENCODING_WEIGHT
        );
        assert_eq!(
            assessment.signals,
            vec![
                "no-html-accept",
                "missing-accept-language",
                "missing-accept-encoding"
            ]
        );
    }

    #[test]
    fn wildcard_accept_counts_as_html() {
        let hello = ClientHello {
            accept: Some("*/*".to_string()),
            ..browser_hello()
        };
        let assessment = evaluate_client_hello(&hello, &HashSet::new());
        assert_eq!(assessment.score, 0);
    }

    #[test]
    fn automation_marker_plus_flagged_address_is_conclusive() {
        let mut suspicious = HashSet::new();
        suspicious.insert("203.0.113.7".to_string());
        let hello = ClientHello {
            automation_marker: true,
            ..browser_hello()
        };
        let assessment = evaluate_client_hello(&hello, &suspicious);
        assert_eq!(
            assessment.score,
            AUTOMATION_HEADER_WEIGHT + FLAGGED_ADDRESS_WEIGHT
        );
        assert!(assessment.is_bot);
    }

    #[test]
    fn adding_signals_never_decreases_the_score() {
        let baseline = evaluate_client_hello(&browser_hello(), &HashSet::new());
        let degraded = [
            ClientHello {
                accept: None,
                ..browser_hello()
            },
            ClientHello {
                accept: None,
                accept_language: None,
                ..browser_hello()
            },
            ClientHello {
                accept: None,
                accept_language: None,
                accept_encoding: None,
                ..browser_hello()
            },
            ClientHello {
                accept: None,
                accept_language: None,
                accept_encoding: None,
                automation_marker: true,
                ..browser_hello()
            },
        ];

        let mut previous = baseline.score;
        for hello in &degraded {
            let next = evaluate_client_hello(hello, &HashSet::new()).score;
            assert!(next > previous, "score must grow with each added signal");
            previous = next;
        }
    }
}
