//! bridge-protocol: wire protocol for the debugger bridge.
//!
//! Defines the request/response/event message shapes exchanged with the
//! front-end client, the bracket-balance framer that splits the inbound
//! byte stream into messages, and typed access to loosely-shaped command
//! arguments.

pub mod args;
pub mod error;
pub mod framer;
pub mod message;

// Re-export key types for convenience.
pub use args::Args;
pub use error::ProtocolError;
pub use framer::{frame_length, FrameBuffer};
pub use message::{
    encode_message, parse_message, ErrorBody, EventBody, EventCategory, EventType, Message,
    MessageType, Request,
};
