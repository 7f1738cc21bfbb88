//! Field-level encrypt/decrypt over a [`KeyManager`].
//!
//! New values are always sealed with the current primary key; stored values
//! are opened with whichever key their envelope names, so rotation never
//! requires re-encrypting existing data.

use std::sync::Arc;

use tracing::warn;

use crate::envelope::{self, Envelope};
use crate::error::Result;
use crate::keys::KeyManager;

/// Result of [`FieldEncryptor::decrypt_or_legacy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// The value was an envelope and decrypted successfully.
    Decrypted(String),
    /// The value is not an envelope; returned unchanged.
    Legacy(String),
}

impl DecryptOutcome {
    pub fn is_legacy(&self) -> bool {
        matches!(self, DecryptOutcome::Legacy(_))
    }

    pub fn into_inner(self) -> String {
        match self {
            DecryptOutcome::Decrypted(value) | DecryptOutcome::Legacy(value) => value,
        }
    }
}

#[derive(Clone)]
pub struct FieldEncryptor {
    keys: Arc<KeyManager>,
}

impl FieldEncryptor {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    pub fn key_manager(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Encrypt with the current primary key.
    ///
    /// Fails with [`VaultError::NoPrimaryKey`](crate::VaultError::NoPrimaryKey)
    /// when no key has been added yet.
    pub async fn encrypt(&self, plaintext: &str) -> Result<String> {
        let key = self.keys.get_primary_key().await?;
        envelope::encrypt(plaintext, &key)
    }

    /// Decrypt an envelope with the key it names.
    pub async fn decrypt(&self, value: &str) -> Result<String> {
        let parsed = Envelope::parse(value)?;
        self.open(&parsed).await
    }

    /// Like [`decrypt`](Self::decrypt), but values that are not envelopes at
    /// all come back as [`DecryptOutcome::Legacy`] instead of an error.
    ///
    /// Only the "not an envelope" case is tolerated. A well-formed envelope
    /// that fails authentication, names an unknown key, or carries an
    /// unsupported version is still an error, so tampering is never mistaken
    /// for legacy plaintext.
    pub async fn decrypt_or_legacy(&self, value: &str) -> Result<DecryptOutcome> {
        let parsed = match Envelope::parse(value) {
            Ok(parsed) => parsed,
            Err(e) if e.is_format_error() => {
                warn!("Value is not an envelope; passing through as legacy plaintext");
                return Ok(DecryptOutcome::Legacy(value.to_string()));
            }
            Err(e) => return Err(e),
        };
        self.open(&parsed).await.map(DecryptOutcome::Decrypted)
    }

    async fn open(&self, parsed: &Envelope) -> Result<String> {
        let key = self.keys.resolve_key(&parsed.key_id).await?;
        envelope::decrypt_envelope(parsed, &key)
    }
}
