mod config;
mod error;
mod models;
mod provider;
mod service;
mod store;

#[cfg(test)]
pub mod test_utils;

pub use config::{Config, LoggingConfig, ProfileStoreConfig, RecoveryConfig, ThrottleConfig, VerificationConfig};
pub use error::auth_error::AuthError;
pub use models::account::{Account, AccountPatch, Principal};
pub use models::recovery::RecoveryRecord;
pub use models::signup::{LoginRequest, SignupRequest};
pub use models::throttle::{LoginAttemptRecord, ThrottleDecision};
pub use provider::{IdentityProvider, ProviderError, ProviderUser, SessionEvent, SessionStream};
pub use service::lifecycle::{AccountLifecycleController, SignupReceipt};
pub use service::recovery::RecoveryCache;
pub use service::throttle::LoginThrottle;
pub use store::{KeyValueStore, MemoryStore, ProfileStore, StoreError};

use tracing_subscriber::EnvFilter;

/// Configure logging with environment variable support.
/// RUST_LOG can be used for fine-grained control per module:
///   RUST_LOG=debug                           - everything at debug
///   RUST_LOG=dongnae_account=debug           - this crate at debug
///   RUST_LOG=info,dongnae_account::service=trace - global info, services at trace
pub fn init_tracing(log_level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    if json_format {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
