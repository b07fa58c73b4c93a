use std::sync::Arc;

use gatehouse_core::tracker::VisitTracker;
use tokio::sync::RwLock;

use crate::audit::AuditLogger;
use crate::config::GateConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    /// Shared visit store. The write guard is only ever held across the
    /// synchronous scoring calls, never across an await of a dependency.
    pub tracker: Arc<RwLock<VisitTracker>>,
    pub audit: AuditLogger,
}

impl AppState {
    pub fn new(config: GateConfig, audit: AuditLogger) -> Self {
        Self {
            config: Arc::new(config),
            tracker: Arc::new(RwLock::new(VisitTracker::new())),
            audit,
        }
    }
}
