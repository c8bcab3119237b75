//! Session Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid session options")]
    Options(snack_config::error::ErrorKind),
    #[display("failed to estimate publish payload size")]
    Size(snack_diff::error::ErrorKind),
    #[display("failed to rewrite source after dependency resolution")]
    Rewrite(snack_rewrite::error::ErrorKind),
    /// `snack_storage::error::ErrorKind` doesn't implement `Clone` (it holds
    /// a raw `io::Error`), so unlike the other wrapped crates its message is
    /// flattened to a string rather than preserved as a nested frame.
    #[display("object store error: {_0}")]
    Storage(#[error(not(source))] String),
    #[display("transport error")]
    Transport(snack_transport::error::ErrorKind),
    #[display("save request failed: {_0}")]
    Save(#[error(not(source))] String),
}

impl ErrorKind {
    #[track_caller]
    pub fn options(err: snack_config::error::Error) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Options(inner))
    }

    #[track_caller]
    pub fn size(err: snack_diff::error::Error) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Size(inner))
    }

    #[track_caller]
    pub fn rewrite(err: snack_rewrite::error::Error) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Rewrite(inner))
    }

    #[track_caller]
    pub fn storage(err: snack_storage::error::Error) -> Error {
        let message = err.to_string();
        err.raise(ErrorKind::Storage(message))
    }

    #[track_caller]
    pub fn transport(err: snack_transport::error::Error) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Transport(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Save(_) => true,
            Self::Options(inner) => inner.is_retryable(),
            Self::Size(inner) => inner.is_retryable(),
            Self::Rewrite(inner) => inner.is_retryable(),
            Self::Storage(_) => true,
            Self::Transport(inner) => inner.is_retryable(),
        }
    }
}
