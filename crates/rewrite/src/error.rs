use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Display, Error)]
pub enum ErrorKind {
    /// Inserting a peer import requires re-scanning the file for an
    /// existing import of the same module; that scan failed.
    #[display("failed to scan source before inserting import: {_0}")]
    Scan(snack_scan::error::ErrorKind),
}

impl ErrorKind {
    /// Preserves the scan crate's own error tree as a child frame, the same
    /// way `snack-storage` folds a compression error into its own kind.
    #[track_caller]
    pub fn scan(err: snack_scan::error::Error) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Scan(inner))
    }

    pub fn is_retryable(&self) -> bool {
        false
    }
}
