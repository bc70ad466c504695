//! Session error types.

use std::net::SocketAddr;

use bridge_frontend::{CommandFailure, FrontendError};
use thiserror::Error;

use crate::channel::{ChannelError, Handle};
use crate::evaluate::EvaluationFailure;

/// Errors from session setup and lifecycle.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The debuggee never reported ready within the retry budget.
    #[error("could not connect to {target} after {attempts} attempts")]
    AttachFailed {
        /// Debuggee address.
        target: SocketAddr,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// The debug channel refused an operation.
    #[error("debug channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The client-facing server failed.
    #[error("frontend error: {0}")]
    Frontend(#[from] FrontendError),
}

/// Errors raised inside command handlers.
///
/// Every variant is reported to the client as an error response whose
/// `exception` field is [`CommandError::kind`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// A frame or variable-set handle is unknown or stale.
    #[error("invalid handle: {0}")]
    InvalidHandle(Handle),

    /// A required argument is absent or has the wrong shape.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// A path sent in URI mode is not an absolute `file:` URI.
    #[error("malformed URI: {0}")]
    MalformedUri(String),

    /// Expression evaluation failed.
    #[error("{0}")]
    Evaluation(#[from] EvaluationFailure),

    /// The debug channel refused an operation.
    #[error("{0}")]
    Channel(#[from] ChannelError),

    /// The response body could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(String),

    /// The session was torn down while the command was waiting.
    #[error("session disposed")]
    Disposed,
}

impl CommandError {
    /// Stable error kind sent as the response's `exception` field.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::InvalidHandle(_) => "InvalidHandle",
            CommandError::MissingArgument(_) => "MissingArgument",
            CommandError::MalformedUri(_) => "MalformedUri",
            CommandError::Evaluation(_) => "Evaluation",
            CommandError::Channel(_) => "Channel",
            CommandError::Encode(_) => "Encode",
            CommandError::Disposed => "Disposed",
        }
    }
}

impl From<CommandError> for CommandFailure {
    fn from(err: CommandError) -> Self {
        CommandFailure::new(err.kind(), err.to_string())
    }
}
