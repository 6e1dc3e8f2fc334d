use crate::models::account::{Account, AccountPatch};
use crate::provider::{IdentityProvider, ProviderError, ProviderUser, SessionEvent, SessionStream};
use crate::store::{ProfileStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

struct RegisteredUser {
    password: String,
    user: ProviderUser,
}

/// Scripted identity provider: accounts live in a map, verification is
/// flipped by the test, and call counters let tests assert what was (and was
/// not) contacted.
#[derive(Default)]
pub struct MockIdentityProvider {
    accounts: Mutex<HashMap<String, RegisteredUser>>,
    signed_in: Mutex<Option<String>>,
    pub create_calls: AtomicU32,
    pub sign_in_calls: AtomicU32,
    pub verification_emails: AtomicU32,
    pub fail_verification_email: AtomicBool,
    events: std::sync::Mutex<Option<mpsc::UnboundedSender<SessionEvent>>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, email: &str, password: &str, verified: bool) -> ProviderUser {
        let user = ProviderUser {
            account_id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: None,
            email_verified: verified,
        };
        let mut accounts = self.accounts.lock().await;
        accounts.insert(
            email.to_string(),
            RegisteredUser {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    pub async fn set_verified(&self, email: &str) {
        let mut accounts = self.accounts.lock().await;
        accounts.get_mut(email).expect("unknown account").user.email_verified = true;
    }

    pub async fn user_for(&self, email: &str) -> ProviderUser {
        let accounts = self.accounts.lock().await;
        accounts.get(email).expect("unknown account").user.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.signed_in.lock().await.is_some()
    }

    pub fn push_session(&self, event: SessionEvent) {
        let events = self.events.lock().expect("events lock");
        events.as_ref().expect("no active subscription").send(event).expect("subscriber gone");
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(email) {
            return Err(ProviderError::DuplicateEmail(email.to_string()));
        }

        let user = ProviderUser {
            account_id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: None,
            email_verified: false,
        };
        accounts.insert(
            email.to_string(),
            RegisteredUser {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        // Creating an account signs the new principal in, as the real
        // provider does; signup must explicitly sign out afterwards.
        *self.signed_in.lock().await = Some(user.account_id.clone());
        Ok(user)
    }

    async fn update_display_name(&self, account_id: &str, display_name: &str) -> Result<(), ProviderError> {
        let mut accounts = self.accounts.lock().await;
        let registered = accounts
            .values_mut()
            .find(|registered| registered.user.account_id == account_id)
            .ok_or(ProviderError::NotFound)?;
        registered.user.display_name = Some(display_name.to_string());
        Ok(())
    }

    async fn send_verification_email(&self, _account_id: &str, _redirect_url: &str) -> Result<(), ProviderError> {
        if self.fail_verification_email.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable);
        }
        self.verification_emails.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);

        let accounts = self.accounts.lock().await;
        let registered = accounts.get(email).ok_or(ProviderError::NotFound)?;
        if registered.password != password {
            return Err(ProviderError::WrongPassword);
        }

        *self.signed_in.lock().await = Some(registered.user.account_id.clone());
        Ok(registered.user.clone())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        *self.signed_in.lock().await = None;
        Ok(())
    }

    fn subscribe(&self) -> SessionStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.events.lock().expect("events lock") = Some(sender);
        receiver
    }
}

/// In-memory document store with injectable outages.
#[derive(Default)]
pub struct MemoryProfileStore {
    documents: Mutex<HashMap<String, Account>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn document(&self, account_id: &str) -> Option<Account> {
        self.documents.lock().await.get(account_id).cloned()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_document(&self, account_id: &str) -> Result<Option<Account>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("injected read failure".to_string()));
        }
        Ok(self.documents.lock().await.get(account_id).cloned())
    }

    async fn upsert_document(&self, account_id: &str, patch: &AccountPatch) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("injected write failure".to_string()));
        }

        let now = Utc::now();
        let mut documents = self.documents.lock().await;
        match documents.get_mut(account_id) {
            Some(document) => {
                patch.apply(document);
                document.updated_at = now;
            }
            None => {
                documents.insert(account_id.to_string(), patch.clone().into_account(account_id, now));
            }
        }
        Ok(())
    }
}
