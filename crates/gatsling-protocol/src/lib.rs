//! Wire protocol for an undocumented positional text format.
//!
//! Everything on the wire is text. An outbound command is a single frame;
//! an inbound payload may bundle several frames joined by `|`. Within a
//! frame the first comma-separated token is the tag and every later
//! position maps, in order, to a field in that tag's schema.
//!
//! This crate is pure: no sockets, no clocks, no state. [`Command`]
//! encodes, [`decode_payload`] / [`decode_frame`] decode, and the sparse
//! update structs ([`PlayerUpdate`], [`ResourceUpdate`]) are handed to a
//! stateful layer to merge.

mod codec;
mod error;
mod names;
mod types;

pub use codec::{
    decode_frame, decode_payload, escape_text, ARG_SEPARATOR,
    ARG_SUBSTITUTE, FRAME_DELIMITER, NAME_SENTINEL, SUB_SEPARATOR,
};
pub use error::ProtocolError;
pub use names::{guest_name, FALLBACK_NAME};
pub use types::{
    Armor, Color, Command, InputId, LeaderboardEntry, MatchStatistics,
    PlayerUpdate, ResourceUpdate, ServerEvent, Skill, Weapon,
};
