//! Wire response format shared with the legacy console clients.
//!
//! Responses are flat key/value lists where each key is replaced by the
//! CRC-32 of its name:
//!
//! ```text
//! {return_code: 5}  ->  [384008305=5;]
//! ```
//!
//! The firmware parses this format directly, so encoding is byte-exact.

pub mod crc;
mod response;
mod return_code;

pub use crc::{crc32, field_key};
pub use response::{WireResponse, RETURN_CODE_FIELD};
pub use return_code::ReturnCode;
