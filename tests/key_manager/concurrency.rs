use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::common::{encryptor, manager, InstrumentedStore};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotation_and_encryption() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, Duration::from_millis(5)).await;
    keys.create_key(Some("seed")).await.unwrap();

    let mut handles = Vec::new();
    for worker in 0..8 {
        let keys = Arc::clone(&keys);
        handles.push(tokio::spawn(async move {
            let fields = encryptor(&keys);
            let mut sealed = Vec::new();
            for i in 0..10 {
                if i % 5 == 0 {
                    keys.rotate(None).await.unwrap();
                }
                let plaintext = format!("worker {} item {}", worker, i);
                let envelope = fields.encrypt(&plaintext).await.unwrap();
                sealed.push((plaintext, envelope));
            }
            sealed
        }));
    }

    let fields = encryptor(&keys);
    for handle in handles {
        for (plaintext, envelope) in handle.await.unwrap() {
            assert_eq!(fields.decrypt(&envelope).await.unwrap(), plaintext);
        }
    }

    let all = keys.get_all_keys().await.unwrap();
    assert_eq!(all.len(), 1 + 8 * 2);
    let ids: HashSet<String> = all.iter().map(|k| k.id().to_string()).collect();
    let primary = keys.primary_key_id().await.unwrap().unwrap();
    assert!(ids.contains(&primary));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_always_see_a_primary_during_promotions() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, Duration::from_millis(1)).await;
    for id in ["A", "B", "C"] {
        keys.create_key(Some(id)).await.unwrap();
    }

    let promoter = {
        let keys = Arc::clone(&keys);
        tokio::spawn(async move {
            for round in 0..30 {
                let id = ["A", "B", "C"][round % 3];
                keys.promote_key(id).await.unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let keys = Arc::clone(&keys);
        readers.push(tokio::spawn(async move {
            for _ in 0..50 {
                let primary = keys.get_primary_key().await.unwrap();
                assert!(["A", "B", "C"].contains(&primary.id()));
            }
        }));
    }

    promoter.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
