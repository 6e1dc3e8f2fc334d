use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Identity record as the provider reports it. `account_id` is opaque and
/// stable; `email_verified` is authoritative here and only mirrored into the
/// profile store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUser {
    pub account_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Email {0} is already in use")]
    DuplicateEmail(String),
    #[error("Password rejected by the identity provider")]
    WeakPassword,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("No account registered for that email")]
    NotFound,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Too many requests")]
    TooManyRequests,
    #[error("Identity provider unavailable")]
    Unavailable,
    #[error("Identity provider error: {0}")]
    Other(String),
}

/// Session-change notification pushed by the provider.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn(ProviderUser),
    SignedOut,
}

/// Single-consumer stream of session changes. Dropping the receiver is the
/// unsubscribe.
pub type SessionStream = mpsc::UnboundedReceiver<SessionEvent>;

/// The external identity authority. Accounts, credentials and the verified
/// flag live here; this crate only consumes the contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError>;

    /// Push the chosen display name into the provider record.
    async fn update_display_name(&self, account_id: &str, display_name: &str) -> Result<(), ProviderError>;

    /// Fire-and-forget; callers treat failures as non-fatal and offer a
    /// resend instead.
    async fn send_verification_email(&self, account_id: &str, redirect_url: &str) -> Result<(), ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Exactly one active subscription per running client.
    fn subscribe(&self) -> SessionStream;
}
