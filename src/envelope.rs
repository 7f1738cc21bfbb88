//! Envelope codec: authenticated encryption of strings into self-describing
//! JSON envelopes.
//!
//! Wire format (compact JSON, field order fixed):
//! `{"Version":1,"KeyId":"..","Nonce":"<b64 12B>","CipherText":"<b64>","Tag":"<b64 16B>"}`
//!
//! Base64 is standard alphabet with padding. The codec holds no state; the
//! caller supplies the key to encrypt with, or a lookup for the key named in
//! the envelope.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use envelope_crypto::{CryptoError, AES_GCM_NONCE_LENGTH, AES_GCM_TAG_LENGTH};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VaultError};
use crate::key::EncryptionKey;

/// The only envelope version this codec produces or accepts.
pub const ENVELOPE_VERSION: i64 = 1;

/// A validated envelope with its binary fields decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub key_id: String,
    pub nonce: [u8; AES_GCM_NONCE_LENGTH],
    pub cipher_text: Vec<u8>,
    pub tag: [u8; AES_GCM_TAG_LENGTH],
}

/// Wire form. Field order here is the serialized order.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireEnvelope {
    version: i64,
    key_id: String,
    nonce: String,
    cipher_text: String,
    tag: String,
}

/// Only the version field, read before anything else is validated. Any JSON
/// number is accepted here so that `2.0` is reported as a version, not as
/// malformed input.
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(rename = "Version")]
    version: serde_json::Number,
}

impl Envelope {
    /// Serialize to the compact wire string.
    pub fn to_json(&self) -> Result<String> {
        let wire = WireEnvelope {
            version: ENVELOPE_VERSION,
            key_id: self.key_id.clone(),
            nonce: STANDARD.encode(self.nonce),
            cipher_text: STANDARD.encode(&self.cipher_text),
            tag: STANDARD.encode(self.tag),
        };
        Ok(serde_json::to_string(&wire)?)
    }

    /// Parse and validate an envelope string.
    ///
    /// The version is checked first, so an unknown version is reported as
    /// such even if other fields are also wrong.
    pub fn parse(input: &str) -> Result<Self> {
        let probe: VersionProbe = serde_json::from_str(input)
            .map_err(|e| VaultError::Format(format!("not an envelope: {}", e)))?;
        if probe.version.as_i64() != Some(ENVELOPE_VERSION) {
            return Err(VaultError::UnsupportedVersion(probe.version.to_string()));
        }

        let wire: WireEnvelope = serde_json::from_str(input)
            .map_err(|e| VaultError::Format(format!("not an envelope: {}", e)))?;
        if wire.key_id.is_empty() {
            return Err(VaultError::Format("KeyId is empty".into()));
        }
        Ok(Self {
            nonce: decode_fixed("Nonce", &wire.nonce)?,
            tag: decode_fixed("Tag", &wire.tag)?,
            cipher_text: decode_field("CipherText", &wire.cipher_text)?,
            key_id: wire.key_id,
        })
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| VaultError::Format(format!("{} is not valid base64: {}", name, e)))
}

fn decode_fixed<const N: usize>(name: &str, value: &str) -> Result<[u8; N]> {
    let bytes = decode_field(name, value)?;
    bytes.as_slice().try_into().map_err(|_| {
        VaultError::Format(format!("{} must be {} bytes, got {}", name, N, bytes.len()))
    })
}

/// Cheap structural check: does `value` parse as JSON carrying a numeric
/// `Version` field? Says nothing about validity.
pub fn looks_like_envelope(value: &str) -> bool {
    let trimmed = value.trim_start();
    trimmed.starts_with('{') && serde_json::from_str::<VersionProbe>(trimmed).is_ok()
}

// ============================================================================
// Encrypt / decrypt
// ============================================================================

/// Encrypt `plaintext` under `key`, producing an envelope string.
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<String> {
    let sealed = envelope_crypto::seal(key.key_bytes(), plaintext.as_bytes())?;
    let envelope = Envelope {
        key_id: key.id().to_string(),
        nonce: sealed.nonce,
        cipher_text: sealed.ciphertext,
        tag: sealed.tag,
    };
    debug!(key_id = %key.id(), "Encrypted value");
    envelope.to_json()
}

/// Decrypt an already parsed envelope with the key it names.
pub fn decrypt_envelope(envelope: &Envelope, key: &EncryptionKey) -> Result<String> {
    if envelope.key_id != key.id() {
        return Err(VaultError::KeyNotFound(envelope.key_id.clone()));
    }
    let plaintext = envelope_crypto::open(
        key.key_bytes(),
        &envelope.nonce,
        &envelope.cipher_text,
        &envelope.tag,
    )
    .map_err(|e| match e {
        CryptoError::AuthenticationFailed => VaultError::Integrity,
        other => VaultError::Crypto(other),
    })?;
    debug!(key_id = %key.id(), "Decrypted value");
    String::from_utf8(plaintext)
        .map_err(|_| VaultError::Format("decrypted payload is not valid UTF-8".into()))
}

/// Parse `input`, look up its key with `resolve`, and decrypt.
///
/// `resolve` returning `None` yields [`VaultError::KeyNotFound`].
pub fn decrypt<F>(input: &str, resolve: F) -> Result<String>
where
    F: FnOnce(&str) -> Option<Arc<EncryptionKey>>,
{
    let envelope = Envelope::parse(input)?;
    let key = resolve(&envelope.key_id)
        .ok_or_else(|| VaultError::KeyNotFound(envelope.key_id.clone()))?;
    decrypt_envelope(&envelope, &key)
}
