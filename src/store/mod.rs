pub mod memory;

pub use memory::MemoryStore;

use crate::models::account::{Account, AccountPatch};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),
    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),
}

/// External durable document store, one document per account. No transactions
/// and no ordering guarantees relative to identity-provider calls; writes can
/// fail independently of the provider operation they accompany.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `None` when no document exists for the account.
    async fn get_document(&self, account_id: &str) -> Result<Option<Account>, StoreError>;

    /// Merge upsert: `None` patch fields keep stored values, the document is
    /// created when absent, and the store assigns `created_at`/`updated_at`.
    async fn upsert_document(&self, account_id: &str, patch: &AccountPatch) -> Result<(), StoreError>;
}

/// Small key/value contract scoped to one device or session. Backs both the
/// recovery cache (device-persistent) and the login attempt record
/// (session-scoped).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
