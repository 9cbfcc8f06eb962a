//! Error types for key activation.

use thiserror::Error;

/// Key-specific errors.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The code does not match `XXX-YYYY-YYYY-YYYY-YYYY`.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// No record for this code in this environment.
    #[error("key not found")]
    KeyNotFound,

    /// Exhausted, or owned by another console.
    #[error("key already activated")]
    AlreadyActivated,

    /// A key with this code already exists.
    #[error("key already exists: {0}")]
    Duplicate(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(String),
}

/// Result type for key operations.
pub type KeyResult<T> = Result<T, KeyError>;
