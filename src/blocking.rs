//! Blocking facade for synchronous callers.
//!
//! Wraps the async [`KeyManager`] and [`FieldEncryptor`] and drives them on an
//! owned current-thread tokio runtime. The facade must not be used from inside
//! an async runtime: `block_on` panics there, and dropping the last handle to
//! the runtime in async context panics too. Async code should use the async
//! types directly.

use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use crate::encryptor::{DecryptOutcome, FieldEncryptor};
use crate::error::{Result, VaultError};
use crate::fields::EncryptedFields;
use crate::key::EncryptionKey;
use crate::keys::{KeyManager, KeyManagerOptions};
use crate::store::SecretStore;

fn build_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(VaultError::Runtime)
}

// ============================================================================
// BlockingKeyManager
// ============================================================================

#[derive(Clone)]
pub struct BlockingKeyManager {
    inner: Arc<KeyManager>,
    runtime: Arc<Runtime>,
}

impl BlockingKeyManager {
    /// Create a manager and load its cache from the store.
    pub fn new(store: Arc<dyn SecretStore>, options: KeyManagerOptions) -> Result<Self> {
        let runtime = build_runtime()?;
        let inner = runtime.block_on(KeyManager::new(store, options))?;
        Ok(Self {
            inner: Arc::new(inner),
            runtime: Arc::new(runtime),
        })
    }

    /// The underlying async manager, shared with this facade.
    pub fn key_manager(&self) -> &Arc<KeyManager> {
        &self.inner
    }

    /// A blocking encryptor sharing this manager and runtime.
    pub fn field_encryptor(&self) -> BlockingFieldEncryptor {
        BlockingFieldEncryptor {
            inner: FieldEncryptor::new(Arc::clone(&self.inner)),
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn get_primary_key(&self) -> Result<Arc<EncryptionKey>> {
        self.runtime.block_on(self.inner.get_primary_key())
    }

    pub fn primary_key_id(&self) -> Result<Option<String>> {
        self.runtime.block_on(self.inner.primary_key_id())
    }

    pub fn get_key(&self, key_id: &str) -> Result<Option<Arc<EncryptionKey>>> {
        self.runtime.block_on(self.inner.get_key(key_id))
    }

    pub fn get_all_keys(&self) -> Result<Vec<Arc<EncryptionKey>>> {
        self.runtime.block_on(self.inner.get_all_keys())
    }

    pub fn add_key(&self, key: EncryptionKey) -> Result<Arc<EncryptionKey>> {
        self.runtime.block_on(self.inner.add_key(key))
    }

    pub fn promote_key(&self, key_id: &str) -> Result<()> {
        self.runtime.block_on(self.inner.promote_key(key_id))
    }

    pub fn create_key(&self, key_id: Option<&str>) -> Result<Arc<EncryptionKey>> {
        self.runtime.block_on(self.inner.create_key(key_id))
    }

    pub fn rotate(&self, key_id: Option<&str>) -> Result<Arc<EncryptionKey>> {
        self.runtime.block_on(self.inner.rotate(key_id))
    }

    pub fn refresh(&self) -> Result<()> {
        self.runtime.block_on(self.inner.refresh())
    }
}

// ============================================================================
// BlockingFieldEncryptor
// ============================================================================

#[derive(Clone)]
pub struct BlockingFieldEncryptor {
    inner: FieldEncryptor,
    runtime: Arc<Runtime>,
}

impl BlockingFieldEncryptor {
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.runtime.block_on(self.inner.encrypt(plaintext))
    }

    pub fn decrypt(&self, value: &str) -> Result<String> {
        self.runtime.block_on(self.inner.decrypt(value))
    }

    pub fn decrypt_or_legacy(&self, value: &str) -> Result<DecryptOutcome> {
        self.runtime.block_on(self.inner.decrypt_or_legacy(value))
    }

    pub fn encrypt_document(&self, fields: &EncryptedFields, doc: &mut Value) -> Result<()> {
        self.runtime
            .block_on(fields.encrypt_document(&self.inner, doc))
    }

    pub fn decrypt_document(&self, fields: &EncryptedFields, doc: &mut Value) -> Result<Vec<String>> {
        self.runtime
            .block_on(fields.decrypt_document(&self.inner, doc))
    }
}
