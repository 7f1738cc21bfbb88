//! AES-256-GCM with a detached authentication tag.
//!
//! The envelope format stores nonce, ciphertext and tag as separate fields, so
//! sealing returns the three parts individually instead of one framed blob.
//! Ciphertext length always equals plaintext length.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::types::{AES_GCM_NONCE_LENGTH, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH};

/// Output of [`seal`]: the three parts of an authenticated ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Fresh random nonce used for this encryption.
    pub nonce: [u8; AES_GCM_NONCE_LENGTH],
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// GCM authentication tag.
    pub tag: [u8; AES_GCM_TAG_LENGTH],
}

/// Generate a random 12-byte nonce for AES-GCM.
pub fn generate_nonce() -> Result<[u8; AES_GCM_NONCE_LENGTH], CryptoError> {
    let mut nonce = [0u8; AES_GCM_NONCE_LENGTH];
    getrandom::getrandom(&mut nonce).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(nonce)
}

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key.len() != AES_KEY_LENGTH {
        return Err(CryptoError::InvalidKeyLength {
            expected: AES_KEY_LENGTH,
            got: key.len(),
        });
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: AES_KEY_LENGTH,
        got: key.len(),
    })
}

/// Encrypt `plaintext` under a 32-byte key with a freshly generated nonce.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<Sealed, CryptoError> {
    let nonce = generate_nonce()?;
    seal_with_nonce(key, nonce, plaintext)
}

fn seal_with_nonce(
    key: &[u8],
    nonce: [u8; AES_GCM_NONCE_LENGTH],
    plaintext: &[u8],
) -> Result<Sealed, CryptoError> {
    let cipher = cipher_for(key)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
        .map_err(|e| {
            buffer.zeroize();
            CryptoError::EncryptionFailed(e.to_string())
        })?;

    let mut tag_bytes = [0u8; AES_GCM_TAG_LENGTH];
    tag_bytes.copy_from_slice(&tag);
    Ok(Sealed {
        nonce,
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Verify and decrypt a detached AES-256-GCM ciphertext.
///
/// The working buffer is zeroized when the tag does not verify, so no partial
/// plaintext ever leaves this function.
pub fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != AES_GCM_NONCE_LENGTH {
        return Err(CryptoError::InvalidNonceLength {
            expected: AES_GCM_NONCE_LENGTH,
            got: nonce.len(),
        });
    }
    if tag.len() != AES_GCM_TAG_LENGTH {
        return Err(CryptoError::InvalidTagLength {
            expected: AES_GCM_TAG_LENGTH,
            got: tag.len(),
        });
    }
    let cipher = cipher_for(key)?;

    let mut buffer = ciphertext.to_vec();
    match cipher.decrypt_in_place_detached(
        Nonce::from_slice(nonce),
        b"",
        &mut buffer,
        Tag::from_slice(tag),
    ) {
        Ok(()) => Ok(buffer),
        Err(_) => {
            buffer.zeroize();
            Err(CryptoError::AuthenticationFailed)
        }
    }
}
