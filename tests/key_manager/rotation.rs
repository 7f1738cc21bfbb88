use std::time::Duration;

use envelope_vault::{Envelope, EncryptionKey, VaultError};

use crate::common::{encryptor, manager, InstrumentedStore};

const TTL: Duration = Duration::from_secs(300);

#[tokio::test]
async fn rotation_keeps_old_envelopes_readable() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    let fields = encryptor(&keys);

    keys.add_key(EncryptionKey::generate("K1").unwrap())
        .await
        .unwrap();
    assert_eq!(keys.get_primary_key().await.unwrap().id(), "K1");

    let e1 = fields.encrypt("hello").await.unwrap();
    assert_eq!(Envelope::parse(&e1).unwrap().key_id, "K1");
    assert_eq!(fields.decrypt(&e1).await.unwrap(), "hello");

    keys.add_key(EncryptionKey::generate("K2").unwrap())
        .await
        .unwrap();
    keys.promote_key("K2").await.unwrap();
    assert_eq!(keys.get_primary_key().await.unwrap().id(), "K2");

    assert_eq!(fields.decrypt(&e1).await.unwrap(), "hello");
    let e2 = fields.encrypt("world").await.unwrap();
    assert_eq!(Envelope::parse(&e2).unwrap().key_id, "K2");
    assert_eq!(fields.decrypt(&e2).await.unwrap(), "world");
}

#[tokio::test]
async fn first_key_needs_no_promotion() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    assert!(matches!(
        keys.get_primary_key().await,
        Err(VaultError::NoPrimaryKey)
    ));

    let created = keys.create_key(None).await.unwrap();
    assert_eq!(keys.get_primary_key().await.unwrap().id(), created.id());
    // key record + primary pointer
    assert_eq!(store.writes(), 2);
}

#[tokio::test]
async fn unknown_key_lookups() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    keys.create_key(Some("K1")).await.unwrap();

    assert!(keys.get_key("nonexistent").await.unwrap().is_none());
    assert!(matches!(
        keys.promote_key("nonexistent").await,
        Err(VaultError::KeyNotFound(id)) if id == "nonexistent"
    ));
    assert_eq!(keys.get_primary_key().await.unwrap().id(), "K1");
}

#[tokio::test]
async fn rotate_promotes_new_key_and_retains_history() {
    let store = InstrumentedStore::new();
    let keys = manager(&store, TTL).await;
    let fields = encryptor(&keys);

    let mut sealed = Vec::new();
    for round in 0..4 {
        let key = keys.rotate(None).await.unwrap();
        assert_eq!(keys.primary_key_id().await.unwrap().as_deref(), Some(key.id()));
        let plaintext = format!("value {}", round);
        sealed.push((plaintext.clone(), fields.encrypt(&plaintext).await.unwrap()));
    }

    assert_eq!(keys.get_all_keys().await.unwrap().len(), 4);
    for (plaintext, envelope) in sealed {
        assert_eq!(fields.decrypt(&envelope).await.unwrap(), plaintext);
    }
}

#[tokio::test]
async fn second_manager_sees_promotions_after_refresh() {
    let store = InstrumentedStore::new();
    let writer = manager(&store, TTL).await;
    let reader = manager(&store, TTL).await;

    writer.create_key(Some("K1")).await.unwrap();
    writer.rotate(Some("K2")).await.unwrap();

    // Within the TTL the reader still answers from its (empty) cache.
    assert!(reader.get_key("K1").await.unwrap().is_none());

    reader.refresh().await.unwrap();
    assert_eq!(reader.get_primary_key().await.unwrap().id(), "K2");
    assert!(reader.get_key("K1").await.unwrap().is_some());
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn keys_survive_a_restart_on_sqlite() {
    use std::sync::Arc;

    use envelope_vault::{FieldEncryptor, KeyManager, KeyManagerOptions, SqliteSecretStore};

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vault.db");

    let sealed = {
        let store = Arc::new(SqliteSecretStore::open(&db).unwrap());
        let keys = Arc::new(
            KeyManager::new(store, KeyManagerOptions::default())
                .await
                .unwrap(),
        );
        keys.create_key(Some("K1")).await.unwrap();
        FieldEncryptor::new(keys).encrypt("persisted").await.unwrap()
    };

    let store = Arc::new(SqliteSecretStore::open(&db).unwrap());
    let keys = Arc::new(
        KeyManager::new(store, KeyManagerOptions::default())
            .await
            .unwrap(),
    );
    assert_eq!(keys.get_primary_key().await.unwrap().id(), "K1");
    assert_eq!(
        FieldEncryptor::new(keys).decrypt(&sealed).await.unwrap(),
        "persisted"
    );
}
