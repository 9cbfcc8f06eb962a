//! Token cryptography and identity handles.
//!
//! - [`TokenCipher`] decodes the encrypted `NDS…` tokens that consoles attach
//!   to every request and recovers the device identity they carry.
//! - [`derive_handle`] turns identity material into the stable SHA-1 handles
//!   used as user, session and product keys.
//!
//! Key material is injected through [`TokenSecrets`]; nothing here reads the
//! process environment.

mod error;
mod handle;
mod secrets;
mod token;

pub use error::{CryptoError, CryptoResult};
pub use handle::{
    derive_handle, generate_password, product_handle, product_token, session_handle,
    user_handle, Handle, DEFAULT_PASSWORD_LEN, HANDLE_LEN,
};
pub use secrets::{TokenSecrets, IV_SIZE, KEY_SIZE};
pub use token::{Token, TokenCipher, RECORD_SIZE, TOKEN_PREFIX};
