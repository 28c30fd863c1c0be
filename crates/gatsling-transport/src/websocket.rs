//! WebSocket implementation of the text transport, via `tokio-tungstenite`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{SocketEvent, SocketId, TransportError};

/// Counter for generating unique socket IDs.
static NEXT_SOCKET_ID: AtomicU64 = AtomicU64::new(1);

/// The concrete stream type produced by `connect_async`.
pub type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Receiving half of a socket's event channel.
pub type SocketEvents = mpsc::UnboundedReceiver<SocketEvent>;

/// One duplex text-message connection.
///
/// Cloning the handle is cheap; all clones share the same underlying
/// connection. Inbound traffic arrives on the [`SocketEvents`] receiver
/// returned at construction, pumped by a background read task.
#[derive(Clone)]
pub struct TextSocket {
    id: SocketId,
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
    open: Arc<AtomicBool>,
}

impl TextSocket {
    /// Dials the given WebSocket URL (`ws://…` or `wss://…`).
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, SocketEvents), TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        tracing::debug!(url, "WebSocket connected");
        Ok(Self::adopt(ws))
    }

    /// Adapts an already-open WebSocket stream instead of dialing out.
    pub fn adopt(ws: WsStream) -> (Self, SocketEvents) {
        let id = SocketId::new(NEXT_SOCKET_ID.fetch_add(1, Ordering::Relaxed));
        let (sink, stream) = ws.split();
        let open = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::unbounded_channel();

        // The socket is open by the time we hold it.
        let _ = tx.send(SocketEvent::Connected);

        tokio::spawn(read_loop(id, stream, tx, Arc::clone(&open)));

        let socket = Self {
            id,
            sink: Arc::new(Mutex::new(sink)),
            open,
        };
        (socket, rx)
    }

    /// Returns this socket's identifier.
    pub fn id(&self) -> SocketId {
        self.id
    }

    /// Whether the connection is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Sends one text message. Returns `false` if the socket is not open
    /// or the write fails; never errors.
    pub async fn send(&self, text: &str) -> bool {
        if !self.is_open() {
            return false;
        }
        let msg = Message::Text(text.into());
        match self.sink.lock().await.send(msg).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(id = %self.id, error = %e, "send failed");
                self.open.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Closes the connection. Idempotent: returns `false` if the socket
    /// was already closed. The read task emits the single `Disconnected`
    /// event once the close completes.
    pub async fn close(&self) -> bool {
        if !self.open.swap(false, Ordering::AcqRel) {
            return false;
        }
        let _ = self.sink.lock().await.close().await;
        tracing::debug!(id = %self.id, "socket closed");
        true
    }
}

/// Pumps the inbound half of the stream into the event channel.
///
/// This is the only place that emits `Disconnected`, which is how
/// duplicate disconnect notifications are suppressed.
async fn read_loop(
    id: SocketId,
    mut stream: SplitStream<WsStream>,
    tx: mpsc::UnboundedSender<SocketEvent>,
    open: Arc<AtomicBool>,
) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let _ = tx.send(SocketEvent::Message(text.as_str().to_owned()));
            }
            Ok(Message::Binary(data)) => {
                match String::from_utf8(data.to_vec()) {
                    Ok(text) => {
                        let _ = tx.send(SocketEvent::Message(text));
                    }
                    Err(_) => {
                        tracing::warn!(%id, "dropping non-UTF-8 frame, closing");
                        let _ = tx.send(SocketEvent::Error(
                            TransportError::InvalidUtf8.to_string(),
                        ));
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue, // ping/pong/raw frames
            Err(e) => {
                let _ = tx.send(SocketEvent::Error(
                    TransportError::ReceiveFailed(e.to_string())
                        .to_string(),
                ));
                break;
            }
        }
    }

    open.store(false, Ordering::Release);
    tracing::debug!(%id, "socket read loop ended");
    let _ = tx.send(SocketEvent::Disconnected);
}
