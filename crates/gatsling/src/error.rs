//! Unified error type for the Gatsling meta-crate.

use gatsling_client::ClientError;
use gatsling_protocol::ProtocolError;
use gatsling_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `gatsling` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GatslingError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (malformed inbound frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A client-level error (lifecycle misuse, failed dial).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The directory had no server running the requested game type.
    #[error("no server running game type '{0}'")]
    NoServer(String),
}
