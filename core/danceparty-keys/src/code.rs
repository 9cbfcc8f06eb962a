//! Unlock key codes.
//!
//! Codes look like `JD5-ABCD-1234-WXY9-0000`: a three-character prefix from
//! `[0-9A-Z]` followed by four groups of four symbols from a 32-symbol
//! alphabet that leaves out `I`, `O`, `U` and `Z`.

use crate::error::{KeyError, KeyResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Symbols allowed in the four trailing groups.
pub const KEY_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKLMNPQRSTVWXY";

/// Length of the prefix group.
pub const PREFIX_LEN: usize = 3;

const GROUP_LEN: usize = 4;
const GROUP_COUNT: usize = 4;

/// Total length of a canonical code.
pub const KEY_CODE_LEN: usize = PREFIX_LEN + GROUP_COUNT * (GROUP_LEN + 1);

/// A canonical (upper-case, well-formed) unlock code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCode(String);

impl KeyCode {
    /// Parses user input, accepting any letter case.
    pub fn parse(raw: &str) -> KeyResult<Self> {
        let canonical = raw.to_ascii_uppercase();
        if !is_valid_key_code(&canonical) {
            return Err(KeyError::InvalidKeyFormat(raw.to_string()));
        }
        Ok(Self(canonical))
    }

    /// Generates a random code with the given prefix.
    pub fn generate(prefix: &str) -> KeyResult<Self> {
        Self::generate_with(prefix, &mut rand::thread_rng())
    }

    /// Generates a random code using the supplied RNG.
    pub fn generate_with<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> KeyResult<Self> {
        let prefix = prefix.to_ascii_uppercase();
        if prefix.len() != PREFIX_LEN || !prefix.bytes().all(is_prefix_symbol) {
            return Err(KeyError::InvalidKeyFormat(format!("invalid prefix `{prefix}`")));
        }

        let mut code = String::with_capacity(KEY_CODE_LEN);
        code.push_str(&prefix);
        for _ in 0..GROUP_COUNT {
            code.push('-');
            for _ in 0..GROUP_LEN {
                code.push(char::from(KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())]));
            }
        }
        Ok(Self(code))
    }

    /// Returns the canonical text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the three-character prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.0[..PREFIX_LEN]
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for KeyCode {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeyCode {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeyCode> for String {
    fn from(code: KeyCode) -> Self {
        code.0
    }
}

/// Checks a code against the grammar exactly as given (case-sensitive).
#[must_use]
pub fn is_valid_key_code(code: &str) -> bool {
    let mut groups = code.split('-');

    let prefix_ok = groups
        .next()
        .is_some_and(|p| p.len() == PREFIX_LEN && p.bytes().all(is_prefix_symbol));
    if !prefix_ok {
        return false;
    }

    let mut count = 0;
    for group in groups {
        count += 1;
        if count > GROUP_COUNT
            || group.len() != GROUP_LEN
            || !group.bytes().all(|b| KEY_ALPHABET.contains(&b))
        {
            return false;
        }
    }
    count == GROUP_COUNT
}

fn is_prefix_symbol(b: u8) -> bool {
    b.is_ascii_digit() || b.is_ascii_uppercase()
}
