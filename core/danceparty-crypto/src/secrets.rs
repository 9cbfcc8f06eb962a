//! Token key material.

use crate::error::{CryptoError, CryptoResult};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the CBC initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// Key, IV and magic shared by every console of this generation.
///
/// The IV is fixed rather than per-message; that is how the issuing service
/// produces tokens and cannot be changed from this side.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TokenSecrets {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
    magic: Vec<u8>,
}

impl TokenSecrets {
    /// Creates secrets from raw bytes.
    pub fn new(key: [u8; KEY_SIZE], iv: [u8; IV_SIZE], magic: Vec<u8>) -> CryptoResult<Self> {
        if magic.is_empty() {
            return Err(CryptoError::EmptyMagic);
        }
        Ok(Self { key, iv, magic })
    }

    /// Parses secrets from hex strings, as found in deployment configuration.
    pub fn from_hex(key: &str, iv: &str, magic: &str) -> CryptoResult<Self> {
        let key_bytes = hex::decode(key.trim())?;
        let iv_bytes = hex::decode(iv.trim())?;
        let magic = hex::decode(magic.trim())?;

        let key: [u8; KEY_SIZE] =
            key_bytes
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: key_bytes.len(),
                })?;
        let iv: [u8; IV_SIZE] =
            iv_bytes
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidIvLength {
                    expected: IV_SIZE,
                    actual: iv_bytes.len(),
                })?;

        Self::new(key, iv, magic)
    }

    pub(crate) fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    pub(crate) fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// Returns the expected trailing magic.
    #[must_use]
    pub fn magic(&self) -> &[u8] {
        &self.magic
    }
}

impl std::fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSecrets")
            .field("key", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .field("magic_len", &self.magic.len())
            .finish()
    }
}
