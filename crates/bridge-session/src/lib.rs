//! bridge-session: the debugger core of the bridge.
//!
//! Owns the connection to the debuggee's remote debugging channel,
//! translates client commands into channel operations, and turns channel
//! events into client notifications. Frame and variable handles handed to
//! the client live in object registries that are cleared on every stop.

pub mod body;
pub mod breakpoint;
pub mod channel;
pub mod commands;
pub mod error;
pub mod evaluate;
pub mod handshake;
pub mod registry;
pub mod session;
pub mod settings;

// Re-export key types for convenience.
pub use breakpoint::{BreakpointRecord, BreakpointTable, Placed};
pub use channel::{
    Availability, BreakpointHandle, ChannelError, ChannelEvent, DebugChannel, EventHandler,
    ExceptionInfo, FrameLocals, Handle, OutputSource, ProcessInfo, RemoteValue, StackFrameInfo,
    ThreadId, ThreadInfo, ValueRef,
};
pub use commands::SessionCommands;
pub use error::{CommandError, SessionError};
pub use evaluate::EvaluationFailure;
pub use registry::ObjectRegistry;
pub use session::{Phase, Session};
pub use settings::ClientSettings;
