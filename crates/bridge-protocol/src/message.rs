//! Bridge message types.
//!
//! Every message on the wire is `{"type": ..., "body": ...}`. Enum values are
//! serialized in camelCase (`"request"`, `"breakpointHit"`, `"stopped"`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Kind of a bridge message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    /// Client → bridge command.
    Request,
    /// Bridge → client command result.
    Response,
    /// Bridge → client notification.
    Event,
}

/// The message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    /// Message kind.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Kind-specific payload.
    #[serde(default)]
    pub body: Value,
}

impl Message {
    /// Build a request message.
    pub fn request(command: impl Into<String>, args: Value) -> Self {
        Self {
            message_type: MessageType::Request,
            body: serde_json::json!({
                "command": command.into(),
                "args": args,
            }),
        }
    }

    /// Build a response message around a handler-defined body.
    pub fn response(body: Value) -> Self {
        Self {
            message_type: MessageType::Response,
            body,
        }
    }

    /// Build an event message.
    ///
    /// Returns `None` when no category is registered for `event_type`.
    pub fn event(event_type: EventType, context: Value) -> Option<Self> {
        let category = event_type.category()?;
        let body = EventBody {
            event_type,
            category,
            context,
        };
        Some(Self {
            message_type: MessageType::Event,
            body: serde_json::to_value(body).ok()?,
        })
    }

    /// Interpret the body of a request message.
    pub fn into_request(self) -> Result<Request, ProtocolError> {
        if self.message_type != MessageType::Request {
            return Err(ProtocolError::UnexpectedType(self.message_type));
        }
        serde_json::from_value(self.body).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Body of a request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Command name.
    pub command: String,
    /// Command arguments; absent arguments are `null`.
    #[serde(default)]
    pub args: Value,
}

/// Response body sent when a command handler fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error kind.
    pub exception: String,
    /// Human-readable description.
    pub message: String,
}

/// Body of an event message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Category derived from the event type.
    pub category: EventCategory,
    /// Event-specific payload.
    pub context: Value,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events the bridge reports to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    /// A step completed.
    DebuggerStep,
    /// A breakpoint was hit.
    BreakpointHit,
    /// An exception was thrown and will be handled.
    HandledExceptionThrown,
    /// An exception was thrown and nothing will handle it.
    UnhandledExceptionThrown,
    /// A pause request was acknowledged.
    Paused,
    /// The debuggee started a thread.
    ThreadStarted,
    /// A debuggee thread exited.
    ThreadExited,
    /// Output captured from the debuggee or the debugging channel.
    Output,
    /// The debuggee process exited.
    ProcessExited,
}

/// Coarse routing group for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventCategory {
    /// Execution stopped.
    Stopped,
    /// Thread lifecycle.
    Thread,
    /// Captured output.
    Output,
    /// Process lifecycle.
    Process,
}

/// Static event type → category table.
const EVENT_CATEGORIES: &[(EventType, EventCategory)] = &[
    (EventType::DebuggerStep, EventCategory::Stopped),
    (EventType::BreakpointHit, EventCategory::Stopped),
    (EventType::HandledExceptionThrown, EventCategory::Stopped),
    (EventType::UnhandledExceptionThrown, EventCategory::Stopped),
    (EventType::Paused, EventCategory::Stopped),
    (EventType::ThreadStarted, EventCategory::Thread),
    (EventType::ThreadExited, EventCategory::Thread),
    (EventType::Output, EventCategory::Output),
    (EventType::ProcessExited, EventCategory::Process),
];

impl EventType {
    /// Look up the category registered for this event type.
    pub fn category(self) -> Option<EventCategory> {
        EVENT_CATEGORIES
            .iter()
            .find(|(event_type, _)| *event_type == self)
            .map(|(_, category)| *category)
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialize a message into the bytes written to the client.
pub fn encode_message(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(message).map_err(|e| ProtocolError::Serialization(e.to_string()))
}

/// Parse one complete frame into a message.
pub fn parse_message(frame: &[u8]) -> Result<Message, ProtocolError> {
    serde_json::from_slice(frame).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
}
