//! Unlock key redemption.
//!
//! This crate handles:
//! - The `XXX-YYYY-YYYY-YYYY-YYYY` code grammar and random code generation
//! - Activation records and their `Available → PartiallyActivated → Exhausted`
//!   lifecycle
//! - The activation rule, executed atomically through [`ActivationStore`]
//!
//! # Activation rule
//!
//! A record that reached its limit is refused unconditionally, including for
//! the console that already owns it. Otherwise a record owned by another
//! console is refused. A successful activation records the owner and time and
//! increments the counter.

mod activation;
mod code;
mod error;
mod record;

pub use activation::{activate, activate_code, mint_keys, ActivationStore};
pub use code::{is_valid_key_code, KeyCode, KEY_ALPHABET, KEY_CODE_LEN, PREFIX_LEN};
pub use error::{KeyError, KeyResult};
pub use record::{ActivationRecord, ActivationState, Grant};
