use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile document for one account, one document per account in the profile
/// store. `account_id` is the provider-issued key and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub signup_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A principal may use the app iff the provider has confirmed its email.
    /// `signup_completed` tracks profile completeness and grants nothing.
    pub fn is_active(&self) -> bool {
        self.email_verified
    }
}

/// Partial update with merge semantics: `None` fields keep the stored value,
/// and the document is created when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountPatch {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub region: Option<String>,
    pub is_local: Option<bool>,
    pub email_verified: Option<bool>,
    pub signup_completed: Option<bool>,
}

impl AccountPatch {
    pub fn apply(&self, account: &mut Account) {
        if let Some(email) = &self.email {
            account.email = email.clone();
        }
        if let Some(display_name) = &self.display_name {
            account.display_name = display_name.clone();
        }
        if let Some(region) = &self.region {
            account.region = region.clone();
        }
        if let Some(is_local) = self.is_local {
            account.is_local = is_local;
        }
        if let Some(email_verified) = self.email_verified {
            account.email_verified = email_verified;
        }
        if let Some(signup_completed) = self.signup_completed {
            account.signup_completed = signup_completed;
        }
    }

    /// Materialize a fresh document from this patch when none exists yet.
    pub fn into_account(self, account_id: &str, now: DateTime<Utc>) -> Account {
        Account {
            account_id: account_id.to_string(),
            email: self.email.unwrap_or_default(),
            display_name: self.display_name.unwrap_or_default(),
            region: self.region.unwrap_or_default(),
            is_local: self.is_local.unwrap_or(false),
            email_verified: self.email_verified.unwrap_or(false),
            signup_completed: self.signup_completed.unwrap_or(false),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The authenticated identity handed to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub account_id: String,
    pub email: String,
    /// Profile snapshot; populated once the session-change reconcile has run.
    pub profile: Option<Account>,
}
