//! Persisted layout of keys in the secret store.
//!
//! - `{keysPath}/primary` → `{"keyId": "<id>" | null}`
//! - `{keysPath}/{keyId}` → `{"id": "<id>", "keyBase64": "<32 bytes>", "createdUtc": "<RFC 3339>"}`

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::key::EncryptionKey;

/// Pointer to the key used for new encryptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKeyRecord {
    #[serde(default)]
    pub key_id: Option<String>,
}

/// One key entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKeyRecord {
    pub id: String,
    pub key_base64: String,
    pub created_utc: DateTime<Utc>,
}

impl From<&EncryptionKey> for StoredKeyRecord {
    fn from(key: &EncryptionKey) -> Self {
        Self {
            id: key.id().to_string(),
            key_base64: STANDARD.encode(key.key_bytes()),
            created_utc: key.created_at(),
        }
    }
}

impl StoredKeyRecord {
    /// Rebuild the key. `path` is only used for error context.
    pub fn into_key(self, path: &str) -> Result<EncryptionKey> {
        let bytes = STANDARD
            .decode(&self.key_base64)
            .map_err(|e| VaultError::CorruptKeyRecord {
                path: path.to_string(),
                reason: format!("keyBase64 is not valid base64: {}", e),
            })?;
        EncryptionKey::from_stored(self.id, &bytes, self.created_utc).map_err(|e| {
            VaultError::CorruptKeyRecord {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })
    }
}
