//! Envelope encryption for string values.
//!
//! Values are sealed with AES-256-GCM under the current primary key and
//! stored as self-describing JSON envelopes naming the key they were sealed
//! with. Keys live in a [`SecretStore`] and are cached by a [`KeyManager`]
//! that refreshes itself on a TTL, so a new key can be promoted without
//! re-encrypting anything already stored.

pub mod blocking;
pub mod encryptor;
pub mod envelope;
pub mod error;
pub mod fields;
pub mod key;
pub mod keys;
pub mod store;

pub use blocking::{BlockingFieldEncryptor, BlockingKeyManager};
pub use encryptor::{DecryptOutcome, FieldEncryptor};
pub use envelope::{decrypt, decrypt_envelope, encrypt, looks_like_envelope, Envelope, ENVELOPE_VERSION};
pub use error::{Result, VaultError};
pub use fields::EncryptedFields;
pub use key::{generate_key_id, validate_key_id, EncryptionKey, PRIMARY_POINTER_NAME};
pub use keys::{KeyManager, KeyManagerOptions};
pub use store::{InMemorySecretStore, SecretStore, StoreError};
#[cfg(feature = "sqlite")]
pub use store::SqliteSecretStore;
