//! Helpers that lift framework types into the core crate's inputs.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use gatehouse_core::signals::{AUTOMATION_MARKER_HEADERS, ClientHello};

/// Best-effort client address: first hop of `X-Forwarded-For` when a proxy
/// supplied one, otherwise the socket peer.
pub fn client_address(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

pub fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// Collect the static signals Layer 1 scores on.
pub fn client_hello(headers: &HeaderMap, address: &str) -> ClientHello {
    ClientHello {
        user_agent: header_str(headers, "user-agent"),
        accept: header_str(headers, "accept"),
        accept_language: header_str(headers, "accept-language"),
        accept_encoding: header_str(headers, "accept-encoding"),
        automation_marker: AUTOMATION_MARKER_HEADERS
            .iter()
            .any(|name| headers.contains_key(*name)),
        origin: address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{client_address, client_hello};
    use axum::http::{HeaderMap, HeaderValue};

    fn peer() -> std::net::SocketAddr {
        "192.0.2.1:4242".parse().unwrap()
    }

    #[test]
    fn forwarded_header_wins_over_the_socket_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_address(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn socket_peer_is_the_fallback() {
        assert_eq!(client_address(&HeaderMap::new(), peer()), "192.0.2.1");
    }

    #[test]
    fn automation_markers_are_detected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-selenium", HeaderValue::from_static("1"));
        let hello = client_hello(&headers, "203.0.113.7");
        assert!(hello.automation_marker);
        assert!(hello.user_agent.is_none());
        assert_eq!(hello.origin, "203.0.113.7");
    }

    #[test]
    fn plain_browser_headers_carry_no_marker() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static("Mozilla/5.0"));
        headers.insert("accept", HeaderValue::from_static("text/html"));
        let hello = client_hello(&headers, "203.0.113.7");
        assert!(!hello.automation_marker);
        assert_eq!(hello.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(hello.accept.as_deref(), Some("text/html"));
    }
}
