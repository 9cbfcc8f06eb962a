//! Error types for the token and handle layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The console token could not be decoded.
    ///
    /// Bad prefix, bad base64, cipher or padding failure, short record and
    /// magic mismatch all collapse into this one variant.
    #[error("console token invalid")]
    TokenInvalid,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Invalid IV length.
    #[error("invalid IV length: expected {expected}, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    /// The token magic must not be empty.
    #[error("token magic is empty")]
    EmptyMagic,

    /// Key material was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A token field does not fit its fixed slot.
    #[error("token field `{field}` exceeds {max} bytes")]
    FieldTooLong { field: &'static str, max: usize },

    /// User id does not fit in 48 bits.
    #[error("user id {0} does not fit in 48 bits")]
    UserIdOutOfRange(u64),

    /// Text is not a well-formed handle.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
}
