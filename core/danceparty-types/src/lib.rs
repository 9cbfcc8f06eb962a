//! Core type definitions for the DanceParty tracking backend.
//!
//! This crate defines the small set of types shared by every other crate:
//! - `Environment`, the deployment tier partitioning products, keys and sessions
//! - The crate-level parse error

mod environment;

pub use environment::Environment;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
}
