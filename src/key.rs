//! The `EncryptionKey` entity: immutable key material plus identity.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use envelope_crypto::{CryptoError, KeyMaterial};
use regex::Regex;

use crate::error::{Result, VaultError};

/// Reserved entry name for the primary-key pointer under the keys path.
pub const PRIMARY_POINTER_NAME: &str = "primary";

/// Key ids double as path segments under the configured keys path.
fn key_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]{0,127}$").expect("static key id pattern")
    })
}

/// Check that `id` can be used as a key id.
pub fn validate_key_id(id: &str) -> Result<()> {
    if id == PRIMARY_POINTER_NAME || !key_id_pattern().is_match(id) {
        return Err(VaultError::InvalidKeyId(id.to_string()));
    }
    Ok(())
}

/// Looser check for ids read back from the store, which may have been written
/// by other tools: any non-empty single path segment other than `primary`.
pub(crate) fn validate_stored_key_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') || id == PRIMARY_POINTER_NAME {
        return Err(VaultError::InvalidKeyId(id.to_string()));
    }
    Ok(())
}

/// Generate a random key id (UUID v4).
pub fn generate_key_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A 256-bit data key with its id and creation time.
///
/// Never mutated once built; rotation creates new keys.
#[derive(Clone)]
pub struct EncryptionKey {
    id: String,
    material: KeyMaterial,
    created_at: DateTime<Utc>,
}

impl EncryptionKey {
    /// Build a key from existing material. `key_bytes` must be exactly 32 bytes.
    pub fn new(id: impl Into<String>, key_bytes: &[u8], created_at: DateTime<Utc>) -> Result<Self> {
        let id = id.into();
        validate_key_id(&id)?;
        Self::with_material(id, key_bytes, created_at)
    }

    /// Rebuild a key loaded from the store. The id only has to be a usable
    /// path segment; see [`validate_stored_key_id`].
    pub(crate) fn from_stored(
        id: String,
        key_bytes: &[u8],
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        validate_stored_key_id(&id)?;
        Self::with_material(id, key_bytes, created_at)
    }

    fn with_material(id: String, key_bytes: &[u8], created_at: DateTime<Utc>) -> Result<Self> {
        let material = KeyMaterial::from_slice(key_bytes).map_err(|e| match e {
            CryptoError::InvalidKeyLength { expected, got } => {
                VaultError::InvalidKeyLength { expected, got }
            }
            other => VaultError::Crypto(other),
        })?;
        Ok(Self {
            id,
            material,
            created_at,
        })
    }

    /// Generate a key with fresh random material, stamped now.
    pub fn generate(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_key_id(&id)?;
        Ok(Self {
            id,
            material: KeyMaterial::generate()?,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key_bytes(&self) -> &[u8] {
        self.material.as_bytes()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Short SHA-256 fingerprint of the material, for logs.
    pub fn fingerprint(&self) -> String {
        self.material.fingerprint()
    }

    /// Same id and same material.
    pub fn same_material(&self, other: &EncryptionKey) -> bool {
        self.id == other.id && self.material == other.material
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("id", &self.id)
            .field("fingerprint", &self.fingerprint())
            .field("created_at", &self.created_at)
            .finish()
    }
}
