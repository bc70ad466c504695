//! The remote debugging channel the session drives.
//!
//! Embedders implement [`DebugChannel`] on top of whatever native protocol
//! reaches the debuggee. The session only needs stepping primitives,
//! thread and frame introspection, breakpoint installation, expression
//! evaluation, and a stream of lifecycle events.
//!
//! Events must be delivered from the channel's own thread. A channel must
//! never invoke the event handler from inside one of its own primitives,
//! because the session holds its lock while calling them.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// Handle issued by an [`ObjectRegistry`](crate::ObjectRegistry). `0` means
/// "absent" and is never issued.
pub type Handle = u32;

/// Debuggee thread identifier.
pub type ThreadId = i64;

/// Channel-side handle of an installed breakpoint.
pub type BreakpointHandle = u64;

/// Errors reported by a [`DebugChannel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel is not attached to a debuggee.
    #[error("debug channel is not connected")]
    NotConnected,

    /// No thread with this ID exists in the debuggee.
    #[error("unknown thread {0}")]
    UnknownThread(ThreadId),

    /// The channel rejected the operation.
    #[error("{0}")]
    Failed(String),
}

/// A debuggee process, as reported by the ready event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Process ID.
    pub id: i64,
    /// Process name.
    pub name: String,
}

/// A debuggee thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadInfo {
    /// Thread ID.
    pub id: ThreadId,
    /// Thread name.
    pub name: String,
}

impl ThreadInfo {
    /// Create a thread descriptor.
    pub fn new(id: ThreadId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One frame of a thread's backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrameInfo {
    /// Thread the frame belongs to.
    pub thread: ThreadId,
    /// Position in the backtrace; 0 is the innermost frame.
    pub index: usize,
    /// Method name.
    pub method: String,
    /// Source file, when known.
    pub file: Option<PathBuf>,
    /// Line in debugger numbering (1-based).
    pub line: i64,
}

/// Readiness outcome of a [`RemoteValue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// The value was fetched.
    Available,
    /// The debuggee cannot produce the value right now.
    NotAvailable,
    /// Evaluation failed with the evaluator's own message.
    Error(String),
}

/// A value read from the debuggee.
///
/// Values are fetched asynchronously by the channel. Callers must call
/// [`wait_ready`](Self::wait_ready) before reading anything else.
pub trait RemoteValue: Send + Sync + fmt::Debug {
    /// Variable or member name.
    fn name(&self) -> String;
    /// Rendered value.
    fn display_value(&self) -> String;
    /// Type name.
    fn type_name(&self) -> String;
    /// Whether the value has members worth expanding.
    fn has_children(&self) -> bool;
    /// Member values.
    fn children(&self) -> Vec<ValueRef>;
    /// Block until the value has been fetched.
    fn wait_ready(&self);
    /// Outcome of the fetch.
    fn availability(&self) -> Availability;
}

/// Shared reference to a debuggee value.
pub type ValueRef = Arc<dyn RemoteValue>;

/// Values visible in one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameLocals {
    /// The receiver, for instance methods.
    pub this: Option<ValueRef>,
    /// Method parameters.
    pub parameters: Vec<ValueRef>,
    /// Local variables.
    pub locals: Vec<ValueRef>,
}

impl FrameLocals {
    /// Receiver, parameters and locals in display order.
    pub fn into_values(self) -> Vec<ValueRef> {
        self.this
            .into_iter()
            .chain(self.parameters)
            .chain(self.locals)
            .collect()
    }
}

/// The exception that stopped the debuggee.
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    /// Exception message.
    pub message: String,
    /// The exception object itself.
    pub instance: ValueRef,
}

/// Origin of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputSource {
    /// Diagnostics from the channel itself.
    Debugger,
    /// Standard output or error of the debuggee.
    Debuggee,
}

impl fmt::Display for OutputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSource::Debugger => f.write_str("Debugger"),
            OutputSource::Debuggee => f.write_str("Debuggee"),
        }
    }
}

/// Lifecycle events delivered by the channel.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The channel started talking to the debuggee.
    Started,
    /// The debuggee is attached and identified.
    Ready {
        /// The attached process.
        process: ProcessInfo,
    },
    /// A step completed.
    Stopped {
        /// Thread that stopped.
        thread: ThreadId,
    },
    /// A breakpoint was hit.
    BreakpointHit {
        /// Thread that hit it.
        thread: ThreadId,
    },
    /// An exception was thrown.
    ExceptionThrown {
        /// Thread that threw.
        thread: ThreadId,
        /// Whether no handler caught it.
        unhandled: bool,
    },
    /// A pause request took effect.
    Interrupted {
        /// Thread that was active when the debuggee suspended.
        thread: ThreadId,
    },
    /// The debuggee process exited.
    Exited,
    /// A thread started.
    ThreadStarted(ThreadInfo),
    /// A thread exited.
    ThreadStopped(ThreadInfo),
    /// A line of output.
    Output {
        /// Where the text came from.
        source: OutputSource,
        /// Whether it was written to stderr.
        stderr: bool,
        /// The text, possibly with a trailing newline.
        text: String,
    },
}

/// Callback receiving channel events.
pub type EventHandler = Arc<dyn Fn(ChannelEvent) + Send + Sync>;

/// Capabilities the session needs from the remote debugging channel.
pub trait DebugChannel: Send + Sync {
    /// Begin connecting to the debuggee at `target`. Returns once the
    /// attempt is underway; readiness arrives as [`ChannelEvent::Ready`].
    fn start(&self, target: SocketAddr) -> Result<(), ChannelError>;

    /// Install (or, with `None`, remove) the event handler.
    fn set_event_handler(&self, handler: Option<EventHandler>);

    /// Whether the debuggee is executing.
    fn is_running(&self) -> bool;

    /// Whether the debuggee has exited.
    fn has_exited(&self) -> bool;

    /// Step over the current line.
    fn next_line(&self) -> Result<(), ChannelError>;

    /// Step into the current line.
    fn step_line(&self) -> Result<(), ChannelError>;

    /// Run until the current method returns.
    fn finish(&self) -> Result<(), ChannelError>;

    /// Resume execution.
    fn resume(&self) -> Result<(), ChannelError>;

    /// Request a pause. Acknowledged by [`ChannelEvent::Interrupted`].
    fn stop(&self) -> Result<(), ChannelError>;

    /// The thread introspection currently applies to.
    fn active_thread(&self) -> Option<ThreadInfo>;

    /// Make `thread` the active thread.
    fn set_active_thread(&self, thread: ThreadId) -> Result<(), ChannelError>;

    /// Live thread list of `process`.
    fn threads(&self, process: &ProcessInfo) -> Result<Vec<ThreadInfo>, ChannelError>;

    /// Depth of `thread`'s backtrace.
    fn frame_count(&self, thread: ThreadId) -> Result<usize, ChannelError>;

    /// Up to `count` frames of `thread`'s backtrace starting at `start`.
    fn frames(
        &self,
        thread: ThreadId,
        start: usize,
        count: usize,
    ) -> Result<Vec<StackFrameInfo>, ChannelError>;

    /// Receiver, parameters and locals of `frame`.
    fn frame_locals(&self, frame: &StackFrameInfo) -> Result<FrameLocals, ChannelError>;

    /// The exception pending on the innermost frame of the active thread.
    fn exception_info(&self) -> Option<ExceptionInfo>;

    /// Install a breakpoint at `line` (debugger numbering) of `file`.
    fn insert_breakpoint(&self, file: &Path, line: i64) -> Result<BreakpointHandle, ChannelError>;

    /// Remove a previously installed breakpoint.
    fn remove_breakpoint(&self, handle: BreakpointHandle) -> Result<(), ChannelError>;

    /// Whether `expression` is acceptable in the context of `frame`.
    fn validate_expression(&self, frame: &StackFrameInfo, expression: &str) -> bool;

    /// Evaluate `expression` in the context of `frame`.
    fn evaluate(&self, frame: &StackFrameInfo, expression: &str) -> Result<ValueRef, ChannelError>;

    /// Disconnect from the debuggee.
    fn detach(&self);
}
