//! Error types for the storage layer.

use danceparty_keys::KeyError;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A row with this unique key already exists.
    #[error("duplicate entry: {0}")]
    Duplicate(String),

    /// A stored value could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A previous holder of the store lock panicked.
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for KeyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(code) => KeyError::Duplicate(code),
            other => KeyError::Store(other.to_string()),
        }
    }
}
