//! Error types for envelope-vault.

use envelope_crypto::CryptoError;
use thiserror::Error;

use crate::store::StoreError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// The value is not a well-formed envelope (bad JSON, missing fields,
    /// bad base64, wrong nonce/tag length, non-UTF-8 plaintext).
    #[error("Malformed envelope: {0}")]
    Format(String),

    /// Any numeric `Version` other than the integer 1, as written on the wire.
    #[error("Unsupported envelope version {0} (this codec supports version 1)")]
    UnsupportedVersion(String),

    #[error("Encryption key not found: {0}")]
    KeyNotFound(String),

    #[error("No primary encryption key is configured")]
    NoPrimaryKey,

    /// Tag verification failed. Never accompanied by any plaintext.
    #[error("Envelope integrity check failed: ciphertext or tag was altered, or the wrong key was used")]
    Integrity,

    #[error("Secret store unavailable during {operation} at '{path}': {source}")]
    StoreUnavailable {
        operation: &'static str,
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid key id '{0}': must be 1-128 characters of [A-Za-z0-9._-], not starting with '.', and not 'primary'")]
    InvalidKeyId(String),

    #[error("Key id already in use: {0}")]
    DuplicateKey(String),

    #[error("Corrupt key record at '{path}': {reason}")]
    CorruptKeyRecord { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to start blocking runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    pub(crate) fn store(operation: &'static str, path: &str, source: StoreError) -> Self {
        VaultError::StoreUnavailable {
            operation,
            path: path.to_string(),
            source,
        }
    }

    /// True for tag verification failures (tampering or wrong key material).
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, VaultError::Integrity)
    }

    /// True when the input was not an envelope at all.
    pub fn is_format_error(&self) -> bool {
        matches!(self, VaultError::Format(_))
    }
}
