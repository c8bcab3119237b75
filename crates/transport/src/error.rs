use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Display, Error)]
pub enum ErrorKind {
    /// The socket could not be established or dropped mid-session.
    #[display("transport connection error: {_0}")]
    Connection(#[error(not(source))] String),
    /// A publish was attempted on a channel the client never subscribed to.
    #[display("not subscribed to channel: {_0}")]
    NotSubscribed(#[error(not(source))] String),
    /// The message could not be serialized for the wire.
    #[display("failed to encode transport message: {_0}")]
    Encode(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed. Per the publication
    /// pipeline's non-goals, the core itself never retries on these, but
    /// the distinction is still worth recording for logs/metrics.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
