//! Cryptographic primitives for envelope-vault.
//!
//! AES-256-GCM with a detached authentication tag, 256-bit key material that
//! zeroizes on drop, and short key fingerprints for logging. Envelope framing
//! and key lifecycle live in the `envelope-vault` crate.

pub mod cipher;
pub mod error;
pub mod key;
pub mod types;

pub use cipher::{generate_nonce, open, seal, Sealed};
pub use error::CryptoError;
pub use key::{key_fingerprint, KeyMaterial};
pub use types::{AES_GCM_NONCE_LENGTH, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH};
