//! Deterministic identity handles.
//!
//! A handle is the lowercase hex SHA-1 of its components concatenated with no
//! separator. Component order is part of the stored-data contract: changing
//! it orphans every existing user, session and product row.

use crate::error::{CryptoError, CryptoResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

/// Length of a handle in hex characters.
pub const HANDLE_LEN: usize = 40;

/// Default length of generated product passwords.
pub const DEFAULT_PASSWORD_LEN: usize = 8;

const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// An opaque 160-bit identifier rendered as hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Parses a handle received from a client or read back from storage.
    pub fn parse(s: &str) -> CryptoResult<Self> {
        let valid = s.len() == HANDLE_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(CryptoError::InvalidHandle(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the hex text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the handle, returning the hex text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Handle {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

/// Derives a handle from ordered components.
pub fn derive_handle<I, S>(components: I) -> Handle
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha1::new();
    for part in components {
        hasher.update(part.as_ref().as_bytes());
    }
    Handle(hex::encode(hasher.finalize()))
}

/// User handle: `[mac]`.
#[must_use]
pub fn user_handle(mac_address: &str) -> Handle {
    derive_handle([mac_address])
}

/// Session handle: `[mac, millis, product_handle]`.
#[must_use]
pub fn session_handle(mac_address: &str, now_millis: i64, product: &Handle) -> Handle {
    derive_handle([mac_address, &now_millis.to_string(), product.as_str()])
}

/// Product handle: `[code, environment]`.
#[must_use]
pub fn product_handle(code: &str, environment: &str) -> Handle {
    derive_handle([code, environment])
}

/// Per-product token: `[product_code, product_password]`.
#[must_use]
pub fn product_token(product_code: &str, product_password: &str) -> Handle {
    derive_handle([product_code, product_password])
}

/// Generates a random alphanumeric password for a new product.
#[must_use]
pub fn generate_password(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())]))
        .collect()
}
