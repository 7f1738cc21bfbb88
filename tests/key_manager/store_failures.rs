use std::sync::Arc;
use std::time::Duration;

use envelope_vault::{EncryptionKey, KeyManager, SecretStore, VaultError};
use tokio::time::advance;

use crate::common::{encryptor, manager, options, InstrumentedStore};

const TTL: Duration = Duration::from_secs(60);

fn is_unavailable(result: &Result<impl Sized, VaultError>, op: &str) -> bool {
    matches!(
        result,
        Err(VaultError::StoreUnavailable { operation, .. }) if *operation == op
    )
}

#[tokio::test]
async fn construction_fails_when_store_is_down() {
    let store = InstrumentedStore::new();
    store.set_failing(true);
    let dyn_store: Arc<dyn SecretStore> = store.clone();
    let result = KeyManager::new(dyn_store, options(TTL)).await;
    assert!(is_unavailable(&result, "refresh"));
}

#[tokio::test]
async fn failed_writes_leave_cache_untouched() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    keys.create_key(Some("K1")).await.unwrap();

    store.set_failing(true);
    let added = keys.add_key(EncryptionKey::generate("K2").unwrap()).await;
    assert!(is_unavailable(&added, "add_key"));
    assert!(is_unavailable(&keys.refresh().await, "refresh"));

    store.set_failing(false);
    assert!(keys.get_key("K2").await.unwrap().is_none());
    keys.create_key(Some("K2")).await.unwrap();

    store.set_failing(true);
    let promoted = keys.promote_key("K2").await;
    assert!(is_unavailable(&promoted, "promote_key"));
    assert_eq!(keys.get_primary_key().await.unwrap().id(), "K1");
}

#[tokio::test]
async fn failed_refresh_keeps_previous_keys() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    let fields = encryptor(&keys);
    keys.create_key(Some("K1")).await.unwrap();
    let sealed = fields.encrypt("hello").await.unwrap();

    store.set_failing(true);
    assert!(keys.refresh().await.is_err());

    // Still within the TTL of the last good refresh.
    assert_eq!(fields.decrypt(&sealed).await.unwrap(), "hello");
    assert_eq!(keys.get_primary_key().await.unwrap().id(), "K1");
}

#[tokio::test(start_paused = true)]
async fn stale_cache_with_store_down_surfaces_the_error() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    keys.create_key(Some("K1")).await.unwrap();

    store.set_failing(true);
    advance(TTL + Duration::from_secs(1)).await;
    let result = keys.get_primary_key().await;
    assert!(is_unavailable(&result, "refresh"));

    store.set_failing(false);
    assert_eq!(keys.get_primary_key().await.unwrap().id(), "K1");
}
