//! Config Error Types
//!
//! Structured errors using `exn` for automatic location tracking, matching
//! the convention used throughout the other `snack-*` crates.

use derive_more::{Display, Error};

/// A config error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Clone, Display, Error)]
pub enum ErrorKind {
    /// The requested channel identifier is shorter than the transport allows.
    #[display("channel must be at least {minimum} characters, got {actual}")]
    ChannelTooShort {
        minimum: usize,
        actual: usize,
    },
    /// A layered config source (file, env) could not be parsed or merged.
    #[display("failed to load host configuration: {_0}")]
    Load(#[error(not(source))] String),
    /// A loaded config value failed validation (bad URL, non-positive interval, ...).
    #[display("invalid host configuration: {_0}")]
    Invalid(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed. Config errors are all
    /// synchronous, fail-fast conditions; none are retryable.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
