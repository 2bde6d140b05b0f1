// Timer-driven entry point: one run lists the clients, then notifies each

mod engine;

pub use engine::{Trigger, TriggerConfig, TriggerEngine};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One client whose notification failed during a run
#[derive(Debug, Clone)]
pub struct FailedNotification {
    pub client_id: String,
    pub error: String,
}

/// Outcome of one run of the entry point.
///
/// A report exists only for runs where client listing succeeded; per-client
/// publish failures are recorded here rather than aborting the run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Clients returned by the lister
    pub listed: usize,
    /// Notifications acknowledged by the broker
    pub published: usize,
    pub failed: Vec<FailedNotification>,
}

impl RunReport {
    /// True when every listed client was notified
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
