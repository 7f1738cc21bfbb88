//! KeyManager: the single source of truth for "which key is primary" and
//! "what key has id X", backed by a [`SecretStore`].
//!
//! Reads are answered from an in-memory [`KeyCache`] that is refreshed from
//! the store once it is older than the configured TTL. Every mutation writes
//! through to the store before touching the cache, so a failure at worst
//! leaves the cache stale until the next refresh.
//!
//! Locking:
//! - the cache sits behind one `parking_lot::RwLock`, taken only for short
//!   in-memory reads or to install new state, never across an `.await`;
//! - refreshes and mutations are serialised by an async `write_gate`, which
//!   is held across secret store I/O. Readers never wait on it unless the
//!   cache is stale.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Result, VaultError};
use crate::key::{generate_key_id, EncryptionKey, PRIMARY_POINTER_NAME};
use crate::store::{join_path, SecretStore, StoreError};

use super::cache::KeyCache;
use super::options::KeyManagerOptions;
use super::records::{PrimaryKeyRecord, StoredKeyRecord};

/// Minimum spacing between refreshes triggered by a lookup miss, so that
/// decrypting envelopes with unknown key ids cannot hammer the store.
const MISS_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

pub struct KeyManager {
    store: Arc<dyn SecretStore>,
    options: KeyManagerOptions,
    cache: RwLock<KeyCache>,
    /// Serialises refreshes and mutations.
    write_gate: Mutex<()>,
}

impl KeyManager {
    /// Create a manager and populate its cache from the store.
    ///
    /// Fails if the options are invalid or the store cannot be read.
    pub async fn new(store: Arc<dyn SecretStore>, options: KeyManagerOptions) -> Result<Self> {
        let options = options.validate()?;
        let manager = Self {
            store,
            options,
            cache: RwLock::new(KeyCache::default()),
            write_gate: Mutex::new(()),
        };
        manager.refresh().await?;
        Ok(manager)
    }

    pub fn options(&self) -> &KeyManagerOptions {
        &self.options
    }

    /// When the cache was last refreshed from the store.
    pub fn last_refreshed_at(&self) -> Option<Instant> {
        self.cache.read().last_refreshed_at()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The key used for new encryptions.
    pub async fn get_primary_key(&self) -> Result<Arc<EncryptionKey>> {
        self.ensure_fresh().await?;
        self.cache.read().primary().ok_or(VaultError::NoPrimaryKey)
    }

    /// Id of the current primary key, if one is configured.
    pub async fn primary_key_id(&self) -> Result<Option<String>> {
        self.ensure_fresh().await?;
        Ok(self.cache.read().primary_key_id().map(str::to_string))
    }

    /// Look up a key by id. A missing id is `Ok(None)`; only store failures
    /// during a refresh are errors.
    pub async fn get_key(&self, key_id: &str) -> Result<Option<Arc<EncryptionKey>>> {
        self.ensure_fresh().await?;
        Ok(self.cache.read().get(key_id))
    }

    /// Look up the key an envelope names.
    ///
    /// Unlike [`get_key`](Self::get_key), a miss forces one refresh (rate
    /// limited) before giving up, so keys added by another process within the
    /// TTL window are still found. Fails with [`VaultError::KeyNotFound`].
    pub async fn resolve_key(&self, key_id: &str) -> Result<Arc<EncryptionKey>> {
        if let Some(key) = self.get_key(key_id).await? {
            return Ok(key);
        }

        {
            let _gate = self.write_gate.lock().await;
            let recently_refreshed = self
                .cache
                .read()
                .last_refreshed_at()
                .is_some_and(|at| at.elapsed() < MISS_REFRESH_INTERVAL);
            if !recently_refreshed {
                debug!(key_id = %key_id, "Key lookup missed, refreshing cache");
                self.refresh_locked().await?;
            }
        }

        self.cache
            .read()
            .get(key_id)
            .ok_or_else(|| VaultError::KeyNotFound(key_id.to_string()))
    }

    /// Snapshot of every cached key, in no particular order.
    pub async fn get_all_keys(&self) -> Result<Vec<Arc<EncryptionKey>>> {
        self.ensure_fresh().await?;
        Ok(self.cache.read().all())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Persist a new key and cache it.
    ///
    /// If no primary key is configured yet, the new key becomes primary and
    /// that pointer is persisted too. Ids are never reused: an id already
    /// present in the cache or the store fails with
    /// [`VaultError::DuplicateKey`].
    pub async fn add_key(&self, key: EncryptionKey) -> Result<Arc<EncryptionKey>> {
        let _gate = self.write_gate.lock().await;
        self.refresh_if_stale_locked().await?;

        let key_id = key.id().to_string();
        let path = self.key_path(&key_id);
        let cached = self.cache.read().contains(&key_id);
        if cached {
            return Err(VaultError::DuplicateKey(key_id));
        }
        let persisted: Option<serde_json::Value> = self.read_record("add_key", &path).await?;
        if persisted.is_some() {
            return Err(VaultError::DuplicateKey(key_id));
        }

        self.write_record("add_key", &path, &StoredKeyRecord::from(&key))
            .await?;

        let needs_primary = self.cache.read().primary_key_id().is_none();
        if needs_primary {
            self.write_primary_pointer(&key_id).await?;
        }

        let key = Arc::new(key);
        self.cache.write().insert(Arc::clone(&key), needs_primary);
        info!(
            key_id = %key_id,
            fingerprint = %key.fingerprint(),
            primary = needs_primary,
            "Added encryption key"
        );
        Ok(key)
    }

    /// Make an existing key the primary key. The previous primary stays
    /// available for decryption.
    pub async fn promote_key(&self, key_id: &str) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.refresh_if_stale_locked().await?;

        let known = self.cache.read().contains(key_id);
        if !known {
            return Err(VaultError::KeyNotFound(key_id.to_string()));
        }

        self.write_primary_pointer(key_id).await?;

        let previous = {
            let mut cache = self.cache.write();
            let previous = cache.primary_key_id().map(str::to_string);
            cache.set_primary(key_id);
            previous
        };
        info!(key_id = %key_id, previous = ?previous, "Promoted encryption key");
        Ok(())
    }

    /// Generate a fresh key and add it. A random UUID id is used when `key_id`
    /// is `None`.
    pub async fn create_key(&self, key_id: Option<&str>) -> Result<Arc<EncryptionKey>> {
        let key_id = match key_id {
            Some(id) => id.to_string(),
            None => generate_key_id(),
        };
        self.add_key(EncryptionKey::generate(key_id)?).await
    }

    /// Generate a fresh key, add it, and promote it.
    pub async fn rotate(&self, key_id: Option<&str>) -> Result<Arc<EncryptionKey>> {
        let key = self.create_key(key_id).await?;
        self.promote_key(key.id()).await?;
        Ok(key)
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Reload the cache from the store, regardless of the TTL.
    pub async fn refresh(&self) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.refresh_locked().await
    }

    fn is_stale(&self) -> bool {
        self.cache
            .read()
            .is_stale(Instant::now(), self.options.cache_ttl)
    }

    async fn ensure_fresh(&self) -> Result<()> {
        if !self.is_stale() {
            return Ok(());
        }
        let _gate = self.write_gate.lock().await;
        self.refresh_if_stale_locked().await
    }

    /// Caller must hold `write_gate`. Rechecks staleness, since another task
    /// may have refreshed while this one waited for the gate.
    async fn refresh_if_stale_locked(&self) -> Result<()> {
        if self.is_stale() {
            self.refresh_locked().await?;
        }
        Ok(())
    }

    /// Caller must hold `write_gate`.
    ///
    /// All store reads complete before the cache is touched; the new state is
    /// then installed in one write. A failed refresh leaves the previous
    /// cache, including its timestamp, in place.
    async fn refresh_locked(&self) -> Result<()> {
        let keys_path = self.options.keys_path.as_str();
        let primary_path = self.primary_path();

        let primary: Option<PrimaryKeyRecord> = self.read_record("refresh", &primary_path).await?;
        let names = self
            .store
            .list_secrets(keys_path)
            .await
            .map_err(|e| VaultError::store("refresh", keys_path, e))?;

        let mut keys = Vec::with_capacity(names.len());
        for name in names {
            if name == PRIMARY_POINTER_NAME || name.ends_with('/') {
                continue;
            }
            let path = self.key_path(&name);
            let record: Option<StoredKeyRecord> = self.read_record("refresh", &path).await?;
            let Some(record) = record else {
                warn!(path = %path, "Key entry disappeared during refresh");
                continue;
            };
            if record.id != name {
                return Err(VaultError::CorruptKeyRecord {
                    path,
                    reason: format!("stored id '{}' does not match entry name", record.id),
                });
            }
            keys.push(record.into_key(&path)?);
        }

        let requested_primary = primary.and_then(|p| p.key_id);
        let (cache, dangling) =
            KeyCache::from_snapshot(keys, requested_primary.clone(), Instant::now());
        if dangling {
            warn!(
                primary = ?requested_primary,
                "Primary key pointer references a missing key; treating as unset"
            );
        }
        debug!(
            keys = cache.len(),
            primary = ?cache.primary_key_id(),
            "Refreshed key cache"
        );
        *self.cache.write() = cache;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Store helpers
    // -----------------------------------------------------------------------

    fn primary_path(&self) -> String {
        join_path(&self.options.keys_path, PRIMARY_POINTER_NAME)
    }

    fn key_path(&self, key_id: &str) -> String {
        join_path(&self.options.keys_path, key_id)
    }

    async fn write_primary_pointer(&self, key_id: &str) -> Result<()> {
        let record = PrimaryKeyRecord {
            key_id: Some(key_id.to_string()),
        };
        self.write_record("promote_key", &self.primary_path(), &record)
            .await
    }

    async fn read_record<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> Result<Option<T>> {
        let value = self
            .store
            .read_secret(path)
            .await
            .map_err(|e| match e {
                StoreError::Corrupted { reason, .. } => VaultError::CorruptKeyRecord {
                    path: path.to_string(),
                    reason,
                },
                other => VaultError::store(operation, path, other),
            })?;
        value
            .map(|v| {
                serde_json::from_value(v).map_err(|e| VaultError::CorruptKeyRecord {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    async fn write_record<T: Serialize + Sync>(
        &self,
        operation: &'static str,
        path: &str,
        record: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.store
            .write_secret(path, &value)
            .await
            .map_err(|e| VaultError::store(operation, path, e))
    }
}
