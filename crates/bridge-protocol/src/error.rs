//! Protocol error types.

use thiserror::Error;

use crate::message::MessageType;

/// Errors raised while framing, parsing, or encoding bridge messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Bracket nesting is broken at the given byte offset.
    #[error("malformed message at byte {index}")]
    Malformed {
        /// Offset of the offending byte.
        index: usize,
    },

    /// A complete frame was not valid JSON for a message.
    #[error("invalid message JSON: {0}")]
    InvalidJson(String),

    /// A message of a type the bridge does not accept inbound.
    #[error("invalid message type: {0:?}")]
    UnexpectedType(MessageType),

    /// Serialization of an outbound message failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
