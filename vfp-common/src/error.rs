//! Common error types for VFP

use thiserror::Error;

/// Common result type for VFP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across VFP crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to the validation backend
    #[error("Backend unreachable: {0}")]
    Backend(String),

    /// Validation backend answered with a non-success status
    #[error("Backend error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
