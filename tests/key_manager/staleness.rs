use std::sync::Arc;
use std::time::Duration;

use tokio::time::advance;

use crate::common::{manager, InstrumentedStore};

const TTL: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn reads_within_ttl_hit_the_cache() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    keys.create_key(Some("K1")).await.unwrap();
    assert_eq!(store.refreshes(), 1);

    let reads_before = store.reads();
    for _ in 0..10 {
        keys.get_primary_key().await.unwrap();
        keys.get_key("K1").await.unwrap();
        keys.get_all_keys().await.unwrap();
    }
    assert_eq!(store.refreshes(), 1);
    assert_eq!(store.reads(), reads_before);
}

#[tokio::test(start_paused = true)]
async fn expired_cache_refreshes_exactly_once() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    keys.create_key(Some("K1")).await.unwrap();

    // Exactly at the TTL the cache is still fresh.
    advance(TTL).await;
    keys.get_primary_key().await.unwrap();
    assert_eq!(store.refreshes(), 1);

    advance(Duration::from_millis(1)).await;
    assert_eq!(keys.get_primary_key().await.unwrap().id(), "K1");
    assert_eq!(store.refreshes(), 2);

    keys.get_primary_key().await.unwrap();
    keys.get_key("K1").await.unwrap();
    assert_eq!(store.refreshes(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_readers_share_one_refresh() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    keys.create_key(Some("K1")).await.unwrap();

    advance(TTL + Duration::from_secs(1)).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let keys = Arc::clone(&keys);
        handles.push(tokio::spawn(async move {
            keys.get_primary_key().await.unwrap().id().to_string()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), "K1");
    }
    assert_eq!(store.refreshes(), 2);
}

#[tokio::test(start_paused = true)]
async fn refresh_picks_up_changes_from_another_manager() {
    let store = InstrumentedStore::new();
    let reader = manager(&store, TTL).await;
    let writer = manager(&store, TTL).await;

    writer.create_key(Some("K1")).await.unwrap();
    assert!(reader.primary_key_id().await.unwrap().is_none());

    advance(TTL + Duration::from_millis(1)).await;
    assert_eq!(reader.primary_key_id().await.unwrap().as_deref(), Some("K1"));
}

#[tokio::test(start_paused = true)]
async fn mutations_refresh_a_stale_cache_first() {
    let store = InstrumentedStore::new();
    let first = manager(&store, TTL).await;
    let second = manager(&store, TTL).await;

    first.create_key(Some("K1")).await.unwrap();
    advance(TTL + Duration::from_millis(1)).await;

    // `second` must learn that K1 is already primary rather than
    // auto-promoting K2 over it.
    second.create_key(Some("K2")).await.unwrap();
    assert_eq!(second.primary_key_id().await.unwrap().as_deref(), Some("K1"));
}
