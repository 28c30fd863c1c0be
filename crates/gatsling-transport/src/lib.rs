//! Text-message WebSocket transport for Gatsling.
//!
//! Provides [`TextSocket`], a single duplex connection that delivers every
//! inbound frame as UTF-8 text through a [`SocketEvent`] channel. The
//! transport knows nothing about the game protocol — it only moves strings.

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{SocketEvents, TextSocket, WsStream};

use std::fmt;

/// Opaque identifier for a socket, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketId(u64);

impl SocketId {
    /// Creates a new `SocketId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sock-{}", self.0)
    }
}

/// Notifications emitted by a [`TextSocket`]'s read task.
///
/// `Disconnected` is emitted at most once per socket, regardless of how
/// the connection ended (clean close, error, or local [`TextSocket::close`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The connection is open and ready to carry messages.
    Connected,
    /// One inbound message, already decoded to text.
    Message(String),
    /// A socket-level failure. Non-fatal on its own; if the connection
    /// died, a `Disconnected` follows.
    Error(String),
    /// The connection is gone.
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_id_new_and_into_inner() {
        let id = SocketId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_socket_id_display() {
        let id = SocketId::new(7);
        assert_eq!(id.to_string(), "sock-7");
    }

    #[test]
    fn test_socket_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(SocketId::new(1), "a");
        map.insert(SocketId::new(2), "b");
        assert_eq!(map[&SocketId::new(1)], "a");
    }
}
