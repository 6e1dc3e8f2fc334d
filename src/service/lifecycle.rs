use crate::config::Config;
use crate::error::auth_error::AuthError;
use crate::models::account::{Account, AccountPatch, Principal};
use crate::models::recovery::RecoveryRecord;
use crate::models::signup::{LoginRequest, SignupRequest};
use crate::models::throttle::ThrottleDecision;
use crate::provider::{IdentityProvider, ProviderUser, SessionEvent, SessionStream};
use crate::service::recovery::RecoveryCache;
use crate::service::throttle::LoginThrottle;
use crate::store::{KeyValueStore, ProfileStore, StoreError};
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use validator::Validate;

/// Receipt for an accepted signup. The account exists and the session is
/// signed out; `email_sent` records whether the verification email actually
/// went out (the user can request a resend when it did not).
#[derive(Debug, Clone)]
pub struct SignupReceipt {
    pub account_id: String,
    pub email_sent: bool,
}

/// Orchestrates signup, the verification gate on every session change,
/// recovery from partial signup failure, and login throttling.
///
/// States of an account as seen from here: created-unverified, then
/// verified-incomplete once the provider confirms the email, then active once
/// the profile document is reconciled. Sign-out is reachable from every state
/// and there is no way back to created-unverified.
pub struct AccountLifecycleController {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    recovery: RecoveryCache,
    throttle: LoginThrottle,
    config: Config,
    current: Mutex<Option<Principal>>,
}

impl AccountLifecycleController {
    /// `device_store` must persist across reloads on this device (it backs
    /// the recovery cache); `session_store` lives and dies with the session
    /// (it backs the login throttle).
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        device_store: Arc<dyn KeyValueStore>,
        session_store: Arc<dyn KeyValueStore>,
        config: Config,
    ) -> Self {
        Self {
            provider,
            profiles,
            recovery: RecoveryCache::new(device_store, config.recovery.ttl_hours),
            throttle: LoginThrottle::new(session_store, config.throttle.clone()),
            config,
            current: Mutex::new(None),
        }
    }

    /// Snapshot of the signed-in identity, or `None` when logged out.
    pub fn current_principal(&self) -> Option<Principal> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Create an account and send the verification email. The principal is
    /// always signed out afterwards: accounts must not be implicitly active
    /// before verification.
    pub async fn signup(&self, request: &SignupRequest) -> Result<SignupReceipt, AuthError> {
        // Fail fast; no network call for malformed input.
        request.validate()?;

        let user = self.provider.create_account(&request.email, &request.password).await?;

        // Sole durable trace of the signup attributes until the profile
        // write lands.
        let record = RecoveryRecord::new(&request.display_name, &request.region, request.is_local);
        self.recovery.put(&user.account_id, &record).await;

        if let Err(error) = self.provider.update_display_name(&user.account_id, &request.display_name).await {
            warn!(account_id = %user.account_id, %error, "display name update failed");
        }

        let email_sent = match self
            .provider
            .send_verification_email(&user.account_id, &self.config.verification.redirect_url)
            .await
        {
            Ok(()) => true,
            Err(error) => {
                warn!(account_id = %user.account_id, %error, "verification email failed, account still created");
                false
            }
        };

        let patch = AccountPatch {
            email: Some(user.email.clone()),
            display_name: Some(request.display_name.clone()),
            region: Some(request.region.clone()),
            is_local: Some(request.is_local),
            email_verified: Some(false),
            signup_completed: Some(false),
        };
        if let Err(error) = self.upsert_profile(&user.account_id, &patch).await {
            // The recovery record reconstructs this after verification.
            warn!(account_id = %user.account_id, %error, "initial profile write failed");
        }

        self.sign_out_quietly().await;

        info!(account_id = %user.account_id, email_sent, "signup accepted, awaiting email verification");
        Ok(SignupReceipt {
            account_id: user.account_id,
            email_sent,
        })
    }

    /// Authenticate against the provider, gated by the login throttle and the
    /// email-verification check. The profile snapshot arrives through the
    /// session-change path, not here.
    pub async fn login(&self, request: &LoginRequest) -> Result<Principal, AuthError> {
        if let ThrottleDecision::Limited { retry_after_secs } = self.throttle.check_submission().await {
            return Err(AuthError::RateLimited { retry_after_secs });
        }

        if request.is_suspicious() {
            self.throttle.record_failure().await;
            return Err(AuthError::SuspiciousRequest);
        }

        let user = match self.provider.sign_in(&request.email, &request.password).await {
            Ok(user) => user,
            Err(error) => {
                self.throttle.record_failure().await;
                return Err(error.into());
            }
        };

        if !user.email_verified {
            // An unverified account must never remain authenticated beyond
            // this check.
            self.sign_out_quietly().await;
            return Err(AuthError::EmailNotVerified);
        }

        self.throttle.reset().await;
        Ok(Principal {
            account_id: user.account_id,
            email: user.email,
            profile: None,
        })
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await?;
        self.clear_current();
        Ok(())
    }

    /// Temporarily sign in to request a fresh verification email, then sign
    /// out again. Rejects accounts that are already verified.
    pub async fn resend_verification(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let user = self.provider.sign_in(email, password).await?;

        if user.email_verified {
            self.sign_out_quietly().await;
            return Err(AuthError::AlreadyVerified);
        }

        let result = self
            .provider
            .send_verification_email(&user.account_id, &self.config.verification.redirect_url)
            .await;
        self.sign_out_quietly().await;

        result.map_err(AuthError::from)
    }

    /// Re-read the profile document for the current principal, falling back
    /// to minimal defaults when the store has nothing.
    pub async fn refresh_profile(&self) {
        let Some(principal) = self.current_principal() else {
            return;
        };

        let profile = match self.fetch_profile(&principal.account_id).await {
            Some(document) => document,
            None => minimal_profile(&principal.account_id, &principal.email, None),
        };

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = current.as_mut() {
            if current.account_id == principal.account_id {
                current.profile = Some(profile);
            }
        }
    }

    /// Drive the controller from the provider's session stream. Returns when
    /// the provider drops its end.
    pub async fn run(self: &Arc<Self>, mut events: SessionStream) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::SignedIn(user) => self.on_session_change(Some(user)).await,
                SessionEvent::SignedOut => self.on_session_change(None).await,
            }
        }
    }

    /// The sole place signup completion and recovery are finalized. Decoupled
    /// from `signup` so that a user who verifies the email in a different
    /// session still converges. Safe to run multiple times concurrently for
    /// the same account: writes are merge upserts and the recovery delete
    /// tolerates a record another run already consumed.
    pub async fn on_session_change(self: &Arc<Self>, user: Option<ProviderUser>) {
        let Some(user) = user else {
            self.clear_current();
            return;
        };

        if !user.email_verified {
            // Mirror of the login-time gate.
            self.sign_out_quietly().await;
            self.clear_current();
            return;
        }

        let profile = match self.fetch_profile(&user.account_id).await {
            Some(document) if !document.signup_completed => self.complete_signup(&user, document).await,
            Some(document) => document,
            None => self.reconstruct_profile(&user).await,
        };

        let principal = Principal {
            account_id: user.account_id,
            email: user.email,
            profile: Some(profile),
        };
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(principal);
    }

    /// Verification just completed: merge stashed signup attributes, mark the
    /// signup done, then bounce the session back to the login surface after a
    /// short confirmation pause.
    async fn complete_signup(self: &Arc<Self>, user: &ProviderUser, document: Account) -> Account {
        let mut patch = AccountPatch {
            email_verified: Some(true),
            signup_completed: Some(true),
            ..Default::default()
        };

        // An empty region means the signup attributes never landed on the
        // document; restore them from the stash.
        if document.region.is_empty() {
            if let Some(record) = self.recovery.get(&user.account_id).await {
                patch.region = Some(record.region.clone());
                patch.is_local = Some(record.is_local);
            }
        }

        match self.upsert_profile(&user.account_id, &patch).await {
            Ok(()) => {
                self.recovery.delete(&user.account_id).await;
                let merged = match self.fetch_profile(&user.account_id).await {
                    Some(fresh) => fresh,
                    None => {
                        let mut merged = document;
                        patch.apply(&mut merged);
                        merged
                    }
                };
                self.schedule_completion_sign_out();
                info!(account_id = %user.account_id, "signup completed");
                merged
            }
            Err(error) => {
                // Keep the recovery record; the next session change retries.
                warn!(account_id = %user.account_id, %error, "signup completion write failed");
                document
            }
        }
    }

    /// No document at all: the signup-time write failed outright, or signup
    /// and verification happened on different devices. Rebuild from the
    /// recovery record when there is one, else from the provider record.
    async fn reconstruct_profile(&self, user: &ProviderUser) -> Account {
        let record = self.recovery.get(&user.account_id).await;
        let (display_name, region, is_local) = match &record {
            Some(record) => (record.display_name.clone(), record.region.clone(), record.is_local),
            None => (fallback_display_name(user.display_name.as_deref(), &user.email), String::new(), false),
        };

        let patch = AccountPatch {
            email: Some(user.email.clone()),
            display_name: Some(display_name),
            region: Some(region),
            is_local: Some(is_local),
            email_verified: Some(true),
            signup_completed: Some(true),
        };

        match self.upsert_profile(&user.account_id, &patch).await {
            Ok(()) => {
                self.recovery.delete(&user.account_id).await;
                info!(account_id = %user.account_id, recovered = record.is_some(), "profile reconstructed");
                match self.fetch_profile(&user.account_id).await {
                    Some(fresh) => fresh,
                    None => patch.into_account(&user.account_id, Utc::now()),
                }
            }
            Err(error) => {
                warn!(account_id = %user.account_id, %error, "profile reconstruction write failed");
                // In-memory snapshot so the session still has a usable
                // profile; the recovery record stays for the next attempt.
                patch.into_account(&user.account_id, Utc::now())
            }
        }
    }

    /// Best effort: an unreachable store reads as "document absent".
    async fn fetch_profile(&self, account_id: &str) -> Option<Account> {
        match timeout(self.store_timeout(), self.profiles.get_document(account_id)).await {
            Ok(Ok(document)) => document,
            Ok(Err(error)) => {
                debug!(account_id = %account_id, %error, "profile read failed");
                None
            }
            Err(_) => {
                warn!(account_id = %account_id, "profile read timed out");
                None
            }
        }
    }

    async fn upsert_profile(&self, account_id: &str, patch: &AccountPatch) -> Result<(), StoreError> {
        match timeout(self.store_timeout(), self.profiles.upsert_document(account_id, patch)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unreachable("profile write timed out".to_string())),
        }
    }

    /// Pause so the UI can show a one-time completion message, then return
    /// the account to the login surface. A UX courtesy only; nothing
    /// sensitive is permitted during the window that the gate elsewhere
    /// would deny.
    fn schedule_completion_sign_out(self: &Arc<Self>) {
        let controller = Arc::clone(self);
        let delay = Duration::from_millis(self.config.verification.completion_sign_out_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.sign_out_quietly().await;
            controller.clear_current();
        });
    }

    async fn sign_out_quietly(&self) {
        if let Err(error) = self.provider.sign_out().await {
            warn!(%error, "sign out failed");
        }
    }

    fn clear_current(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.config.profile_store.op_timeout_secs)
    }
}

fn fallback_display_name(display_name: Option<&str>, email: &str) -> String {
    if let Some(name) = display_name {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    let local_part = email.split('@').next().unwrap_or("");
    if local_part.is_empty() {
        "사용자".to_string()
    } else {
        local_part.to_string()
    }
}

fn minimal_profile(account_id: &str, email: &str, display_name: Option<&str>) -> Account {
    let patch = AccountPatch {
        email: Some(email.to_string()),
        display_name: Some(fallback_display_name(display_name, email)),
        email_verified: Some(true),
        ..Default::default()
    };
    patch.into_account(account_id, Utc::now())
}
