//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means a malformed inbound frame. Callers are
//! expected to log it and move on — the wire format is undocumented and
//! the server occasionally grows new shapes, so a bad frame degrades to a
//! diagnostic, never a crash.

/// Errors that can occur while decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A field declared as an integer in the tag schema failed to parse.
    #[error("tag '{tag}': field '{field}' is not an integer: {value:?}")]
    BadField {
        /// The frame's tag.
        tag: String,
        /// The schema name of the offending field.
        field: &'static str,
        /// The raw token.
        value: String,
    },

    /// The frame violates the tag's shape in some other way
    /// (missing discriminant, unknown sub-type, …).
    #[error("tag '{tag}': {reason}")]
    InvalidFrame {
        /// The frame's tag.
        tag: String,
        /// What was wrong with it.
        reason: String,
    },
}
