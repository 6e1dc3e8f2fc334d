use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub throttle: ThrottleConfig,
    pub recovery: RecoveryConfig,
    pub verification: VerificationConfig,
    pub profile_store: ProfileStoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ThrottleConfig {
    /// Failures tolerated before the escalating lockout starts.
    pub failure_threshold: u32,
    /// Lockout at the threshold; doubles with every further failure.
    pub base_lock_seconds: u64,
    /// Fixed pause between consecutive submissions, whatever their outcome.
    pub submit_cooldown_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecoveryConfig {
    /// Recovery records older than this are treated as absent by readers.
    pub ttl_hours: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VerificationConfig {
    /// Landing URL embedded in the verification email.
    pub redirect_url: String,
    /// Pause before the post-completion sign-out, so the UI can show a
    /// one-time confirmation. A UX courtesy, not a security boundary.
    pub completion_sign_out_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProfileStoreConfig {
    /// Profile-store operations hanging longer than this are treated as
    /// failed and fall back to the recovery paths.
    pub op_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            base_lock_seconds: 60,
            submit_cooldown_ms: 1500,
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            redirect_url: "https://dongnae.app".to_string(),
            completion_sign_out_delay_ms: 2000,
        }
    }
}

impl Default for ProfileStoreConfig {
    fn default() -> Self {
        Self { op_timeout_secs: 10 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Dongnae.toml (base configuration file)
    /// 2. Environment variables prefixed with DONGNAE_, with `__` between
    ///    section and key (e.g. DONGNAE_THROTTLE__FAILURE_THRESHOLD=10)
    pub fn load() -> Result<Self, figment::Error> {
        let figment = Figment::new()
            // Start with defaults
            .merge(Toml::string(&toml::to_string(&Config::default()).unwrap()).nested())
            // Layer on Dongnae.toml if it exists
            .merge(Toml::file("Dongnae.toml").nested())
            // Layer on environment variables
            .merge(Env::prefixed("DONGNAE_").split("__"));

        figment.extract()
    }
}
