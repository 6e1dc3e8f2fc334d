use crate::store::{KeyValueStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory key/value store. Default backing for device-local state in
/// environments without platform storage, and the test double everywhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        Ok(())
    }
}
