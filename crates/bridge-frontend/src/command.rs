//! Command name → handler table.
//!
//! Handlers are registered explicitly as `(name, callback)` pairs. A later
//! registration under an existing name replaces the earlier one.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bridge_protocol::{Args, ErrorBody};
use serde_json::Value;

/// A failed command, reported to the client as an error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Stable error kind.
    pub exception: String,
    /// Human-readable description.
    pub message: String,
}

impl CommandFailure {
    /// Create a failure of the given kind.
    pub fn new(exception: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exception: exception.into(),
            message: message.into(),
        }
    }
}

impl From<CommandFailure> for ErrorBody {
    fn from(failure: CommandFailure) -> Self {
        ErrorBody {
            exception: failure.exception,
            message: failure.message,
        }
    }
}

/// Outcome of a command: `Ok(None)` means "send no response".
pub type CommandResult = Result<Option<Value>, CommandFailure>;

/// A registered command callback.
pub type Callback = Arc<dyn Fn(Args) -> CommandResult + Send + Sync>;

/// An object that contributes commands to the table.
pub trait CommandHandler {
    /// Name used to identify this handler's commands in logs.
    fn handler_name(&self) -> &str;

    /// The commands this handler provides.
    fn commands(&self) -> Vec<(&'static str, Callback)>;
}

struct Entry {
    owner: String,
    callback: Callback,
}

/// Thread-safe command table.
#[derive(Default)]
pub struct CommandTable {
    entries: RwLock<HashMap<String, Entry>>,
}

impl CommandTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `name`.
    ///
    /// `owner` identifies the registering handler. Returns the owner of the
    /// entry that was replaced, if any.
    pub fn set(&self, name: &str, owner: &str, callback: Callback) -> Option<String> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = entries.insert(
            name.to_string(),
            Entry {
                owner: owner.to_string(),
                callback,
            },
        );
        match previous {
            Some(old) => {
                tracing::info!("Command {} = {} (overrides {})", name, owner, old.owner);
                Some(old.owner)
            }
            None => {
                tracing::info!("Command {} = {}", name, owner);
                None
            }
        }
    }

    /// Invoke the command registered under `name`.
    ///
    /// Returns `None` for unknown commands; the client gets no response.
    pub fn call(&self, name: &str, args: Args) -> Option<CommandResult> {
        let callback = {
            let entries = self
                .entries
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match entries.get(name) {
                Some(entry) => entry.callback.clone(),
                None => {
                    tracing::info!("Command {} doesn't exist - response will not be sent", name);
                    return None;
                }
            }
        };

        tracing::info!("Calling command: {}", name);
        Some(callback(args))
    }

    /// Whether a command is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field("command_count", &self.len())
            .finish()
    }
}
