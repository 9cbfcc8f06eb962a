//! Protocol result codes.
//!
//! These values were recovered from the shipped clients and must not be
//! renumbered.

use serde::{Serialize, Serializer};
use std::fmt;

/// The `return_code` carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReturnCode {
    /// Undefined failure; also used for every store or parameter error.
    InternalError = 0,
    /// Login accepted, handles issued.
    LoginSuccessful = 1,
    /// Telemetry tag stored.
    TagReceived = 2,
    /// Tag not configured for this product.
    TagNotConfigured = 3,
    /// Console token could not be decoded.
    TokenIncorrect = 4,
    /// Unlock key redeemed.
    KeyActivationSuccessful = 5,
    /// Unlock key already used up or owned by another console.
    KeyAlreadyActivated = 6,
    /// Unlock key malformed or unknown.
    InvalidKey = 7,
    /// Product credentials or handle unknown.
    UnknownProduct = 8,
}

impl ReturnCode {
    /// Returns the numeric wire value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this code reports a successful action.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(
            self,
            Self::LoginSuccessful | Self::TagReceived | Self::KeyActivationSuccessful
        )
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for ReturnCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl From<ReturnCode> for serde_json::Value {
    fn from(code: ReturnCode) -> Self {
        serde_json::Value::from(code.as_u8())
    }
}
