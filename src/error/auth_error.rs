use crate::provider::ProviderError;
use crate::store::StoreError;
use thiserror::Error;
use validator::ValidationErrors;

/// Everything the account lifecycle can surface to the UI.
///
/// Provider-authoritative failures (credentials, duplicate email, verification
/// state) pass through verbatim so the UI can localize them. Durable-store
/// failures stay internal: signup and login recover through the recovery
/// cache and log a warning instead of failing the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Email {0} is already in use")]
    DuplicateEmail(String),
    #[error("Password is too weak")]
    WeakPassword,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("No account registered for that email")]
    AccountNotFound,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Identity provider unavailable")]
    ProviderUnavailable,
    #[error("Email not verified")]
    EmailNotVerified,
    #[error("Email is already verified")]
    AlreadyVerified,
    #[error("Too many attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("Too many attempts, please try again later")]
    ProviderThrottled,
    #[error("Submission rejected")]
    SuspiciousRequest,
    #[error("Store unreachable")]
    StoreUnreachable { message: String },
    #[error("Authentication failed: {0}")]
    Unknown(String),
}

impl AuthError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreUnreachable { message: message.into() }
    }
}

impl From<ProviderError> for AuthError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::DuplicateEmail(email) => AuthError::DuplicateEmail(email),
            ProviderError::WeakPassword => AuthError::WeakPassword,
            ProviderError::InvalidEmail => AuthError::InvalidEmail,
            ProviderError::NotFound => AuthError::AccountNotFound,
            ProviderError::WrongPassword => AuthError::WrongPassword,
            ProviderError::TooManyRequests => AuthError::ProviderThrottled,
            ProviderError::Unavailable => AuthError::ProviderUnavailable,
            ProviderError::Other(message) => AuthError::Unknown(message),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        AuthError::store(error.to_string())
    }
}
