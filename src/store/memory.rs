//! In-process secret store.
//!
//! Useful for tests and single-process deployments. Contents are lost when
//! the process exits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::traits::{child_names, SecretStore, StoreError};

/// A [`SecretStore`] backed by a map held in memory.
#[derive(Default)]
pub struct InMemorySecretStore {
    /// path → secret
    secrets: RwLock<BTreeMap<String, Value>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets.
    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.read().is_empty()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.secrets.read().keys().cloned().collect()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn read_secret(&self, path: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.secrets.read().get(path).cloned())
    }

    async fn write_secret(&self, path: &str, data: &Value) -> Result<(), StoreError> {
        self.secrets.write().insert(path.to_string(), data.clone());
        Ok(())
    }

    async fn list_secrets(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let secrets = self.secrets.read();
        Ok(child_names(path, secrets.keys().map(String::as_str)))
    }

    async fn delete_secret(&self, path: &str) -> Result<(), StoreError> {
        self.secrets.write().remove(path);
        Ok(())
    }
}
