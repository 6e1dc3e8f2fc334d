use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Signup attributes stashed on the device between account creation and the
/// first durable profile write. Write-once, read-many-until-consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub display_name: String,
    pub region: String,
    pub is_local: bool,
    pub timestamp: DateTime<Utc>,
}

impl RecoveryRecord {
    pub fn new(display_name: &str, region: &str, is_local: bool) -> Self {
        Self {
            display_name: display_name.to_string(),
            region: region.to_string(),
            is_local,
            timestamp: Utc::now(),
        }
    }

    /// Records older than the TTL are ignored by readers. They are not
    /// proactively deleted; this bounds how long a failed profile write can
    /// be silently recovered.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.timestamp > ttl
    }
}
