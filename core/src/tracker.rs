use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::assessment::RiskAssessment;

pub const RAPID_REQUEST_WEIGHT: i32 = 40;
pub const RAPID_REQUEST_WINDOW_MS: i64 = 1000;
pub const EXCESSIVE_VISITS_WEIGHT: i32 = 30;
pub const EXCESSIVE_VISITS_THRESHOLD: u32 = 10;
pub const ADDRESS_CHANGE_WEIGHT: i32 = 50;
pub const LAYER2_BOT_THRESHOLD: i32 = 60;

/// Visit history for one session key. Lives for the process lifetime; only
/// an administrative reset removes it.
#[derive(Debug, Clone)]
pub struct VisitorSession {
    /// Address the session was first observed from. Deliberately not updated
    /// on later visits so address churn keeps firing the penalty.
    pub origin: String,
    pub visits: u32,
    pub page_views: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Process-lifetime store of visitor sessions and flagged addresses.
///
/// An owned value with no interior locking: the api crate wraps it in
/// `Arc<RwLock<...>>` and holds the write guard only across these
/// synchronous calls. Growth is unbounded; there is no eviction in the
/// base design.
#[derive(Debug, Default)]
pub struct VisitTracker {
    sessions: HashMap<String, VisitorSession>,
    suspicious: HashSet<String>,
}

impl VisitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer-2 scorer: records the observation and scores the session's
    /// behavior in one step. The first observation of a key always scores
    /// zero; a fresh visitor earns no suspicion from this layer.
    pub fn record_and_score(
        &mut self,
        session_key: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        let mut assessment = RiskAssessment::default();

        match self.sessions.get_mut(session_key) {
            None => {
                self.sessions.insert(
                    session_key.to_string(),
                    VisitorSession {
                        origin: origin.to_string(),
                        visits: 1,
                        page_views: 1,
                        first_seen: now,
                        last_seen: now,
                    },
                );
            }
            Some(session) => {
                session.visits += 1;
                session.page_views += 1;

                let elapsed = now - session.last_seen;
                if elapsed < Duration::milliseconds(RAPID_REQUEST_WINDOW_MS) {
                    assessment.add(RAPID_REQUEST_WEIGHT, "rapid-successive-requests");
                }
                if session.visits > EXCESSIVE_VISITS_THRESHOLD {
                    assessment.add(EXCESSIVE_VISITS_WEIGHT, "excessive-visits");
                    self.suspicious.insert(origin.to_string());
                }
                if session.origin != origin {
                    assessment.add(ADDRESS_CHANGE_WEIGHT, "address-changed");
                }
                session.last_seen = now;
            }
        }

        assessment.is_bot = assessment.score >= LAYER2_BOT_THRESHOLD;
        assessment
    }

    pub fn suspicious_addresses(&self) -> &HashSet<String> {
        &self.suspicious
    }

    pub fn is_suspicious(&self, address: &str) -> bool {
        self.suspicious.contains(address)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn suspicious_count(&self) -> usize {
        self.suspicious.len()
    }

    pub fn session(&self, session_key: &str) -> Option<&VisitorSession> {
        self.sessions.get(session_key)
    }

    /// Administrative reset: drops all sessions and flagged addresses.
    /// Returns the counts that were cleared. Safe to repeat.
    pub fn reset(&mut self) -> (usize, usize) {
        let cleared = (self.sessions.len(), self.suspicious.len());
        self.sessions.clear();
        self.suspicious.clear();
        cleared
    }
}

/// Session key for a visitor that supplied no identifier of its own:
/// a short digest over the address and arrival time.
pub fn derive_session_key(address: &str, now: DateTime<Utc>) -> String {
    let digest = Sha256::digest(format!("{address}:{}", now.timestamp_millis()));
    hex::encode(digest)[..16].to_string()
}
