//! Form fields posted by the console.

use crate::error::{TrackingError, TrackingResult};
use danceparty_types::Environment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three protocol actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Track,
    ActivateKey,
}

impl Action {
    /// Returns the wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Track => "track",
            Self::ActivateKey => "activatekey",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(Self::Login),
            "track" => Ok(Self::Track),
            "activatekey" => Ok(Self::ActivateKey),
            other => Err(TrackingError::UnknownAction(other.to_string())),
        }
    }
}

/// A request body as posted by the console.
///
/// Every field is optional on the wire; each action checks the ones it needs.
/// Empty strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRequest {
    pub action: Option<String>,
    pub token: Option<String>,
    pub product_code: Option<String>,
    pub product_password: Option<String>,
    pub env: Option<String>,
    pub key: Option<String>,
    pub product_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub tag: Option<String>,
    pub attributes: Option<String>,
    pub delta: Option<String>,
    pub sequence: Option<String>,
}

impl TrackingRequest {
    /// Parses the `action` field.
    pub fn action(&self) -> TrackingResult<Action> {
        match present(&self.action) {
            Some(action) => action.parse(),
            None => Err(TrackingError::UnknownAction(String::new())),
        }
    }

    /// Parses the `env` field. Unknown tiers count as missing.
    pub fn environment(&self) -> TrackingResult<Environment> {
        required(&self.env, "env")?
            .parse()
            .map_err(|_| TrackingError::MissingParameters("env"))
    }
}

/// Returns the field value unless it is absent or empty.
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

pub(crate) fn required<'a>(
    field: &'a Option<String>,
    name: &'static str,
) -> TrackingResult<&'a str> {
    present(field).ok_or(TrackingError::MissingParameters(name))
}

/// Reads a leading decimal integer (optional whitespace and sign, then
/// digits). Input without one reads as 0.
#[must_use]
pub fn leading_int(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else { return 0 };
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    let Ok(value) = digits[..end].parse::<i64>() else {
        return 0;
    };
    if negative { -value } else { value }
}
