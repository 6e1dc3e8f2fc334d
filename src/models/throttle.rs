use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-session login attempt bookkeeping. Lives in the session-scoped store
/// and is never persisted beyond the browser session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    pub failure_count: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub last_submission: Option<DateTime<Utc>>,
}

/// Outcome of consulting the throttle before a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}
