//! bridge-frontend: client-facing half of the debugger bridge.
//!
//! Owns the loopback listener, accepts one client at a time, frames and
//! dispatches inbound requests through the command table, and writes
//! responses and events back to the client.

pub mod command;
pub mod connection;
pub mod error;
pub mod frontend;

// Re-export key types for convenience.
pub use command::{Callback, CommandFailure, CommandHandler, CommandResult, CommandTable};
pub use connection::Connection;
pub use error::FrontendError;
pub use frontend::Frontend;
