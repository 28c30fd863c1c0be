//! Stateful bot client for Gatsling.
//!
//! Layers, bottom to top:
//! - [`Connection`] — one socket lifetime: framing, handshake, keepalive,
//!   key-release timing
//! - [`PlayerStore`] / [`Player`] — the merged world state built from
//!   sparse server frames
//! - [`Client`] — lifecycle, high-level game actions and the event stream
//!   a bot owner consumes

mod client;
mod connection;
mod error;
mod player;
mod store;

pub use client::{
    Client, ClientConfig, ClientEvent, ClientEvents, Compass,
    TICK_INTERVAL,
};
pub use connection::{
    Connection, ConnectionEvent, ConnectionEvents, KEEPALIVE_INTERVAL,
    KEY_TAP,
};
pub use error::ClientError;
pub use player::Player;
pub use store::{PlayerStore, StoreEvent, CHAT_TTL};
