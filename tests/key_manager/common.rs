use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use envelope_vault::{
    FieldEncryptor, InMemorySecretStore, KeyManager, KeyManagerOptions, SecretStore, StoreError,
};
use serde_json::Value;

pub const KEYS_PATH: &str = "tests/keys";

/// Wraps an in-memory store, counting calls and optionally failing them all.
#[derive(Default)]
pub struct InstrumentedStore {
    inner: InMemorySecretStore,
    failing: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
    lists: AtomicUsize,
}

impl InstrumentedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Each refresh lists the keys path exactly once.
    pub fn refreshes(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for InstrumentedStore {
    async fn read_secret(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.read_secret(path).await
    }

    async fn write_secret(&self, path: &str, data: &Value) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.write_secret(path, data).await
    }

    async fn list_secrets(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.list_secrets(path).await
    }

    async fn delete_secret(&self, path: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete_secret(path).await
    }
}

pub fn options(ttl: Duration) -> KeyManagerOptions {
    KeyManagerOptions::new(KEYS_PATH, ttl)
}

pub async fn manager(store: &Arc<InstrumentedStore>, ttl: Duration) -> Arc<KeyManager> {
    let store: Arc<dyn SecretStore> = store.clone();
    Arc::new(KeyManager::new(store, options(ttl)).await.unwrap())
}

pub fn encryptor(keys: &Arc<KeyManager>) -> FieldEncryptor {
    FieldEncryptor::new(Arc::clone(keys))
}
