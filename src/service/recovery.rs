use crate::models::recovery::RecoveryRecord;
use crate::store::KeyValueStore;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bridges the gap between an identity-provider account existing and a
/// profile document existing, when those two writes are not transactional.
///
/// Every failure is swallowed into a warning: losing a recovery record costs
/// one reconstruction path, never the signup itself.
pub struct RecoveryCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

fn record_key(account_id: &str) -> String {
    format!("recovery:{account_id}")
}

impl RecoveryCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl_hours: i64) -> Self {
        Self {
            store,
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub async fn put(&self, account_id: &str, record: &RecoveryRecord) {
        let value = match serde_json::to_value(record) {
            Ok(value) => value,
            Err(error) => {
                warn!(account_id = %account_id, %error, "recovery record serialization failed");
                return;
            }
        };
        if let Err(error) = self.store.put(&record_key(account_id), value).await {
            warn!(account_id = %account_id, %error, "recovery record write failed");
        }
    }

    /// Expired records read as absent; they are not deleted here.
    pub async fn get(&self, account_id: &str) -> Option<RecoveryRecord> {
        let value = match self.store.get(&record_key(account_id)).await {
            Ok(value) => value?,
            Err(error) => {
                warn!(account_id = %account_id, %error, "recovery record read failed");
                return None;
            }
        };

        let record: RecoveryRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(error) => {
                warn!(account_id = %account_id, %error, "recovery record corrupt, ignoring");
                return None;
            }
        };

        if record.is_expired(self.ttl) {
            debug!(account_id = %account_id, "recovery record expired, ignoring");
            return None;
        }

        Some(record)
    }

    /// Idempotent: deleting a record another run already consumed is fine.
    pub async fn delete(&self, account_id: &str) {
        if let Err(error) = self.store.delete(&record_key(account_id)).await {
            warn!(account_id = %account_id, %error, "recovery record delete failed");
        }
    }
}
