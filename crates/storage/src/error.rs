//! Object Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Object does not exist under this key.
    #[display("object not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Key contains invalid characters or escapes the store root.
    #[display("invalid object key: {}", _0.display())]
    InvalidKey(#[error(not(source))] PathBuf),
    /// Underlying local filesystem I/O error.
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Network-related error talking to a remote backend (S3, etc.).
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Backend-specific error not covered by the categories above.
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::BackendError(_))
    }
}
