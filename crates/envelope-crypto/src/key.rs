//! 256-bit symmetric key material.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::types::AES_KEY_LENGTH;

/// Number of SHA-256 bytes shown in a key fingerprint.
const FINGERPRINT_BYTES: usize = 8;

/// Raw AES-256 key bytes, wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: [u8; AES_KEY_LENGTH],
}

impl KeyMaterial {
    /// Build key material from a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; AES_KEY_LENGTH] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: AES_KEY_LENGTH,
                got: bytes.len(),
            })?;
        Ok(Self { bytes })
    }

    /// Generate fresh key material from the OS random number generator.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; AES_KEY_LENGTH];
        getrandom::getrandom(&mut bytes).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Short, non-reversible identifier suitable for logs.
    pub fn fingerprint(&self) -> String {
        key_fingerprint(&self.bytes)
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial([REDACTED])")
    }
}

/// First 8 bytes of SHA-256 over the key, lowercase hex.
pub fn key_fingerprint(key: &[u8]) -> String {
    let digest = Sha256::digest(key);
    digest[..FINGERPRINT_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
