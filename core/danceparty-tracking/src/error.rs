//! Error types for the protocol actions.

use danceparty_crypto::CryptoError;
use danceparty_keys::KeyError;
use danceparty_store::StoreError;
use danceparty_wire::ReturnCode;
use thiserror::Error;

/// Result type for protocol actions.
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Why a request was refused.
///
/// Every variant maps to exactly one [`ReturnCode`]; several share
/// [`ReturnCode::InternalError`] because the clients cannot tell them apart.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("missing or invalid parameter: {0}")]
    MissingParameters(&'static str),

    #[error("console token invalid")]
    TokenInvalid,

    #[error("invalid key format")]
    InvalidKeyFormat,

    #[error("key not found")]
    KeyNotFound,

    #[error("key already activated")]
    AlreadyActivated,

    #[error("product not found")]
    ProductNotFound,

    /// The client must log in again.
    #[error("user or session not found")]
    UserOrSessionNotFound,

    #[error("store failure: {0}")]
    StoreFailure(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

impl TrackingError {
    /// The return code reported to the client.
    #[must_use]
    pub fn return_code(&self) -> ReturnCode {
        match self {
            Self::TokenInvalid => ReturnCode::TokenIncorrect,
            Self::InvalidKeyFormat | Self::KeyNotFound => ReturnCode::InvalidKey,
            Self::AlreadyActivated => ReturnCode::KeyAlreadyActivated,
            Self::ProductNotFound => ReturnCode::UnknownProduct,
            Self::MissingParameters(_)
            | Self::UserOrSessionNotFound
            | Self::StoreFailure(_)
            | Self::UnknownAction(_) => ReturnCode::InternalError,
        }
    }
}

impl From<CryptoError> for TrackingError {
    fn from(_: CryptoError) -> Self {
        Self::TokenInvalid
    }
}

impl From<KeyError> for TrackingError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::InvalidKeyFormat(_) => Self::InvalidKeyFormat,
            KeyError::KeyNotFound => Self::KeyNotFound,
            KeyError::AlreadyActivated => Self::AlreadyActivated,
            other => Self::StoreFailure(other.to_string()),
        }
    }
}

impl From<StoreError> for TrackingError {
    fn from(err: StoreError) -> Self {
        Self::StoreFailure(err.to_string())
    }
}
