use crate::config::ThrottleConfig;
use crate::models::throttle::{LoginAttemptRecord, ThrottleDecision};
use crate::store::KeyValueStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::warn;

const ATTEMPT_KEY: &str = "login_attempts";

/// Client-side friction against credential guessing, advisory only: it slows
/// casual automated retries and gives the user a concrete retry-after, while
/// the identity provider is assumed to rate limit authoritatively on its side.
///
/// The attempt record lives in a session-scoped store, so it disappears with
/// the session and is never synchronized across devices.
pub struct LoginThrottle {
    store: Arc<dyn KeyValueStore>,
    config: ThrottleConfig,
}

impl LoginThrottle {
    pub fn new(store: Arc<dyn KeyValueStore>, config: ThrottleConfig) -> Self {
        Self { store, config }
    }

    /// Gate one submission: enforces an active lockout and the fixed
    /// double-submission cooldown, then stamps the submission time.
    pub async fn check_submission(&self) -> ThrottleDecision {
        let mut record = self.load().await;
        let now = Utc::now();

        if let Some(lock_until) = record.lock_until {
            if lock_until > now {
                let retry_after_secs = (lock_until - now).num_seconds().max(1) as u64;
                return ThrottleDecision::Limited { retry_after_secs };
            }
        }

        if let Some(last) = record.last_submission {
            if now - last < Duration::milliseconds(self.config.submit_cooldown_ms as i64) {
                return ThrottleDecision::Limited { retry_after_secs: 1 };
            }
        }

        record.last_submission = Some(now);
        self.save(&record).await;
        ThrottleDecision::Allowed
    }

    pub async fn is_locked(&self) -> bool {
        match self.load().await.lock_until {
            Some(lock_until) => lock_until > Utc::now(),
            None => false,
        }
    }

    pub async fn record_failure(&self) {
        let mut record = self.load().await;
        record.failure_count += 1;
        record.lock_until = lock_until_for(record.failure_count, &self.config, Utc::now());
        if let Some(lock_until) = record.lock_until {
            warn!(failure_count = record.failure_count, lock_until = %lock_until, "login lockout engaged");
        }
        self.save(&record).await;
    }

    /// Called on successful login. Clears the failure count and lockout; the
    /// submission cooldown still applies to the next attempt.
    pub async fn reset(&self) {
        let mut record = self.load().await;
        record.failure_count = 0;
        record.lock_until = None;
        self.save(&record).await;
    }

    async fn load(&self) -> LoginAttemptRecord {
        match self.store.get(ATTEMPT_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|error| {
                warn!(%error, "login attempt record corrupt, starting clean");
                LoginAttemptRecord::default()
            }),
            Ok(None) => LoginAttemptRecord::default(),
            Err(error) => {
                warn!(%error, "session store read failed");
                LoginAttemptRecord::default()
            }
        }
    }

    async fn save(&self, record: &LoginAttemptRecord) {
        match serde_json::to_value(record) {
            Ok(value) => {
                if let Err(error) = self.store.put(ATTEMPT_KEY, value).await {
                    warn!(%error, "session store write failed");
                }
            }
            Err(error) => warn!(%error, "login attempt record serialization failed"),
        }
    }
}

/// Lockout for the given failure count, once the threshold has been crossed:
/// `base * 2^(count - threshold)` seconds. The exponent saturates at 16 to
/// keep the arithmetic in range; growth stays monotonic.
fn lock_until_for(failure_count: u32, config: &ThrottleConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if failure_count < config.failure_threshold {
        return None;
    }
    let exponent = (failure_count - config.failure_threshold).min(16);
    let lock_seconds = config.base_lock_seconds.saturating_mul(1 << exponent);
    Some(now + Duration::seconds(lock_seconds as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn throttle() -> LoginThrottle {
        LoginThrottle::new(Arc::new(MemoryStore::new()), ThrottleConfig::default())
    }

    fn no_cooldown() -> LoginThrottle {
        LoginThrottle::new(
            Arc::new(MemoryStore::new()),
            ThrottleConfig {
                submit_cooldown_ms: 0,
                ..ThrottleConfig::default()
            },
        )
    }

    #[test]
    fn no_lockout_below_threshold() {
        let config = ThrottleConfig::default();
        let now = Utc::now();

        assert!(lock_until_for(1, &config, now).is_none());
        assert!(lock_until_for(4, &config, now).is_none());
    }

    #[test]
    fn lockout_doubles_past_threshold() {
        let config = ThrottleConfig::default();
        let now = Utc::now();

        let fifth = lock_until_for(5, &config, now).unwrap();
        assert_eq!((fifth - now).num_seconds(), 60);

        let sixth = lock_until_for(6, &config, now).unwrap();
        assert_eq!((sixth - now).num_seconds(), 120);

        let seventh = lock_until_for(7, &config, now).unwrap();
        assert_eq!((seventh - now).num_seconds(), 240);
    }

    #[test]
    fn lockout_saturates_instead_of_overflowing() {
        let config = ThrottleConfig::default();
        let now = Utc::now();

        let far = lock_until_for(200, &config, now).unwrap();
        let cap = lock_until_for(5 + 16, &config, now).unwrap();
        assert_eq!(far, cap);
    }

    #[tokio::test]
    async fn locks_after_five_failures() {
        let throttle = no_cooldown();

        for _ in 0..4 {
            throttle.record_failure().await;
            assert!(!throttle.is_locked().await);
        }

        throttle.record_failure().await;
        assert!(throttle.is_locked().await);
        assert!(matches!(
            throttle.check_submission().await,
            ThrottleDecision::Limited { retry_after_secs } if retry_after_secs <= 60
        ));
    }

    #[tokio::test]
    async fn reset_clears_the_lockout() {
        let throttle = no_cooldown();

        for _ in 0..5 {
            throttle.record_failure().await;
        }
        assert!(throttle.is_locked().await);

        throttle.reset().await;
        assert!(!throttle.is_locked().await);
        assert_eq!(throttle.check_submission().await, ThrottleDecision::Allowed);
    }

    #[tokio::test]
    async fn cooldown_blocks_rapid_double_submission() {
        let throttle = throttle();

        assert_eq!(throttle.check_submission().await, ThrottleDecision::Allowed);
        assert!(matches!(throttle.check_submission().await, ThrottleDecision::Limited { .. }));
    }

    #[tokio::test]
    async fn cooldown_expires() {
        let throttle = LoginThrottle::new(
            Arc::new(MemoryStore::new()),
            ThrottleConfig {
                submit_cooldown_ms: 50,
                ..ThrottleConfig::default()
            },
        );

        assert_eq!(throttle.check_submission().await, ThrottleDecision::Allowed);
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        assert_eq!(throttle.check_submission().await, ThrottleDecision::Allowed);
    }
}
