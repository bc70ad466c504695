//! Suspend/resume handshake between command handlers and debuggee events.
//!
//! The flags live inside the session state so they are only touched under
//! the session lock. [`wait_for_suspend`] parks on a condition variable
//! paired with that same lock, which releases it while waiting so the
//! event thread can deliver the stop.

use std::sync::{Condvar, MutexGuard};

/// Handshake state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SuspendFlags {
    running: bool,
    signaled: bool,
    closed: bool,
}

impl SuspendFlags {
    /// Create flags for a debuggee that is not running.
    pub fn new() -> Self {
        Self::default()
    }

    /// The debuggee was attached and is executing.
    ///
    /// A stop that arrived while attaching stays pending.
    pub fn set_running(&mut self) {
        self.running = true;
    }

    /// A command resumed the debuggee; any earlier stop is stale.
    pub fn resumed(&mut self) {
        self.running = true;
        if !self.closed {
            self.signaled = false;
        }
    }

    /// The debuggee stopped or exited.
    pub fn signal(&mut self) {
        self.signaled = true;
    }

    /// Wake every waiter permanently.
    pub fn close(&mut self) {
        self.closed = true;
        self.signaled = true;
    }

    /// Whether the session considers the debuggee running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a stop is pending.
    pub fn is_signaled(&self) -> bool {
        self.signaled
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn consume(&mut self) {
        self.running = false;
        if !self.closed {
            self.signaled = false;
        }
    }
}

/// Block until the debuggee is stopped.
///
/// Returns immediately when the flags say the debuggee is not running.
/// Otherwise waits for a signal, consumes it, and marks the debuggee as
/// not running. `flags` projects the handshake out of the guarded state.
pub fn wait_for_suspend<'a, T, F>(
    guard: MutexGuard<'a, T>,
    condvar: &Condvar,
    flags: F,
) -> MutexGuard<'a, T>
where
    F: Fn(&mut T) -> &mut SuspendFlags,
{
    let mut guard = guard;
    if !flags(&mut *guard).is_running() {
        return guard;
    }

    tracing::debug!("Waiting for the debuggee to suspend");
    guard = condvar
        .wait_while(guard, |state| !flags(state).is_signaled())
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    flags(&mut *guard).consume();
    guard
}
