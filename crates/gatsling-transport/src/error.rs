/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Dialing the remote server failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// A binary frame was not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}
