//! In-memory key cache state.
//!
//! `keys_by_id`, `primary_key_id` and `last_refreshed_at` form one unit: the
//! manager keeps the whole struct behind a single lock and replaces it
//! wholesale on refresh, so readers never see a primary id without its key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::key::EncryptionKey;

#[derive(Debug, Default)]
pub struct KeyCache {
    keys_by_id: HashMap<String, Arc<EncryptionKey>>,
    primary_key_id: Option<String>,
    last_refreshed_at: Option<Instant>,
}

impl KeyCache {
    /// Build a fully-populated cache from a refresh.
    ///
    /// A primary id that does not name one of `keys` is dropped; the second
    /// value of the result reports whether that happened.
    pub fn from_snapshot(
        keys: Vec<EncryptionKey>,
        primary_key_id: Option<String>,
        refreshed_at: Instant,
    ) -> (Self, bool) {
        let keys_by_id: HashMap<String, Arc<EncryptionKey>> = keys
            .into_iter()
            .map(|key| (key.id().to_string(), Arc::new(key)))
            .collect();
        let dangling = primary_key_id
            .as_ref()
            .is_some_and(|id| !keys_by_id.contains_key(id));
        let primary_key_id = primary_key_id.filter(|id| keys_by_id.contains_key(id));
        (
            Self {
                keys_by_id,
                primary_key_id,
                last_refreshed_at: Some(refreshed_at),
            },
            dangling,
        )
    }

    /// True when the cache was never filled or is older than `ttl`.
    pub fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        match self.last_refreshed_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) > ttl,
        }
    }

    pub fn last_refreshed_at(&self) -> Option<Instant> {
        self.last_refreshed_at
    }

    pub fn get(&self, key_id: &str) -> Option<Arc<EncryptionKey>> {
        self.keys_by_id.get(key_id).cloned()
    }

    pub fn contains(&self, key_id: &str) -> bool {
        self.keys_by_id.contains_key(key_id)
    }

    pub fn primary_key_id(&self) -> Option<&str> {
        self.primary_key_id.as_deref()
    }

    pub fn primary(&self) -> Option<Arc<EncryptionKey>> {
        self.primary_key_id
            .as_deref()
            .and_then(|id| self.keys_by_id.get(id).cloned())
    }

    /// Snapshot of all keys, in no particular order.
    pub fn all(&self) -> Vec<Arc<EncryptionKey>> {
        self.keys_by_id.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys_by_id.is_empty()
    }

    /// Insert a key, optionally making it primary in the same step.
    pub fn insert(&mut self, key: Arc<EncryptionKey>, make_primary: bool) {
        let id = key.id().to_string();
        self.keys_by_id.insert(id.clone(), key);
        if make_primary {
            self.primary_key_id = Some(id);
        }
    }

    /// Point the primary id at a cached key. Returns false, changing
    /// nothing, when the key is not cached.
    pub fn set_primary(&mut self, key_id: &str) -> bool {
        if !self.keys_by_id.contains_key(key_id) {
            return false;
        }
        self.primary_key_id = Some(key_id.to_string());
        true
    }
}
