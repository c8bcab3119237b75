use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Display, Error)]
pub enum ErrorKind {
    /// A `require(...)` call's string literal never closes; the source
    /// can't be scanned reliably past this point.
    #[display("unterminated require() string literal on line {line}")]
    UnterminatedRequire { line: usize },
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
