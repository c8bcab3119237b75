use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Display, Error)]
pub enum ErrorKind {
    /// The payload could not be serialized to estimate its transport size.
    #[display("failed to estimate payload size: {_0}")]
    Serialize(#[error(not(source))] String),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
