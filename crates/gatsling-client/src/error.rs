//! Error types for the client layer.

use gatsling_transport::TransportError;

/// Errors that can occur while driving a bot client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// `start()` was called while a connection is already running.
    #[error("client is already started")]
    AlreadyStarted,

    /// A lifecycle operation needs a running connection and there is none.
    #[error("client is not started")]
    NotStarted,

    /// The underlying websocket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
