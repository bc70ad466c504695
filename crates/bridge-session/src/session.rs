//! Debugger session: attach loop, event handling, and shared state.
//!
//! Command handlers (see `commands.rs`) and channel events both run under
//! the session lock, so they never interleave. Handlers that need a
//! stopped debuggee park on the suspend handshake, which releases the
//! lock while waiting.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};

use bridge_config::{AttachConfig, Config, SessionConfig};
use bridge_frontend::Frontend;
use bridge_protocol::EventType;
use serde_json::json;

use crate::breakpoint::BreakpointTable;
use crate::channel::{
    ChannelEvent, DebugChannel, EventHandler, ExceptionInfo, OutputSource, ProcessInfo,
    StackFrameInfo, ThreadId, ValueRef,
};
use crate::commands::SessionCommands;
use crate::error::{CommandError, SessionError};
use crate::handshake::{self, SuspendFlags};
use crate::registry::ObjectRegistry;
use crate::settings::ClientSettings;

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not attached.
    Disconnected,
    /// Waiting for the debuggee to report ready.
    Connecting,
    /// Attached; the debuggee is executing.
    Running,
    /// Attached; the debuggee is suspended.
    Stopped,
    /// The debuggee process exited.
    Exited,
}

/// State guarded by the session lock.
pub(crate) struct SessionState {
    pub(crate) phase: Phase,
    pub(crate) process: Option<ProcessInfo>,
    pub(crate) frames: ObjectRegistry<StackFrameInfo>,
    pub(crate) variables: ObjectRegistry<Vec<ValueRef>>,
    pub(crate) current_exception: Option<ValueRef>,
    pub(crate) stopped_thread: Option<ThreadId>,
    pub(crate) seen_threads: BTreeMap<ThreadId, String>,
    pub(crate) breakpoints: BreakpointTable,
    pub(crate) settings: ClientSettings,
    pub(crate) suspend: SuspendFlags,
}

fn suspend_flags(state: &mut SessionState) -> &mut SuspendFlags {
    &mut state.suspend
}

/// A bridge session between one debuggee and one client frontend.
pub struct Session {
    pub(crate) channel: Arc<dyn DebugChannel>,
    pub(crate) frontend: Arc<Frontend>,
    pub(crate) config: SessionConfig,
    attach: AttachConfig,
    target: SocketAddr,
    state: Mutex<SessionState>,
    suspended: Condvar,
    disposed: AtomicBool,
}

impl Session {
    /// Create a session and wire it to `channel` and `frontend`.
    ///
    /// Registers the channel event handler and installs the session's
    /// commands into the frontend. Nothing connects until
    /// [`attach`](Self::attach).
    pub fn new(
        channel: Arc<dyn DebugChannel>,
        frontend: Arc<Frontend>,
        target: SocketAddr,
        config: &Config,
    ) -> Arc<Self> {
        let settings = ClientSettings::from_current_dir(
            config.session.use_uri,
            config.session.lines_start_at,
        );
        let session = Arc::new(Self {
            channel,
            frontend,
            config: config.session.clone(),
            attach: config.attach.clone(),
            target,
            state: Mutex::new(SessionState {
                phase: Phase::Disconnected,
                process: None,
                frames: ObjectRegistry::new(),
                variables: ObjectRegistry::new(),
                current_exception: None,
                stopped_thread: None,
                seen_threads: BTreeMap::new(),
                breakpoints: BreakpointTable::new(),
                settings,
                suspend: SuspendFlags::new(),
            }),
            suspended: Condvar::new(),
            disposed: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&session);
        let handler: EventHandler = Arc::new(move |event| {
            if let Some(session) = Weak::upgrade(&weak) {
                session.handle_event(event);
            }
        });
        session.channel.set_event_handler(Some(handler));
        session
            .frontend
            .set_handler(&SessionCommands::new(Arc::downgrade(&session)));

        session
    }

    /// Debuggee address.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// The client-facing server.
    pub fn frontend(&self) -> &Arc<Frontend> {
        &self.frontend
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Start the channel and poll until the debuggee reports ready.
    ///
    /// Fails when the retry budget runs out, or earlier if the channel
    /// stops running.
    pub async fn attach(&self) -> Result<(), SessionError> {
        self.lock().phase = Phase::Connecting;
        tracing::info!("Attempting to connect to {}...", self.target);

        if let Err(e) = self.channel.start(self.target) {
            self.lock().phase = Phase::Disconnected;
            return Err(e.into());
        }

        let mut attempts = 0;
        while attempts < self.attach.max_attempts {
            attempts += 1;
            tokio::time::sleep(self.attach.interval()).await;

            if self.try_complete_attach() {
                tracing::info!("Successfully connected to {}!", self.target);
                return Ok(());
            }
            if !self.channel.is_running() {
                break;
            }
        }

        tracing::error!("Could not connect to {} - exiting", self.target);
        self.lock().phase = Phase::Disconnected;
        Err(SessionError::AttachFailed {
            target: self.target,
            attempts,
        })
    }

    fn try_complete_attach(&self) -> bool {
        let mut state = self.lock();
        if state.process.is_none() {
            return false;
        }
        if state.phase == Phase::Connecting {
            state.phase = Phase::Running;
        }
        state.suspend.set_running();
        true
    }

    /// Attach, then serve the client until the frontend stops.
    pub async fn run(&self) -> Result<(), SessionError> {
        self.attach().await?;
        Arc::clone(&self.frontend).run().await?;
        Ok(())
    }

    /// Tear the session down.
    ///
    /// Unsubscribes from channel events, detaches the channel, stops the
    /// frontend, and wakes any command parked on the handshake.
    /// Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Disposing session");

        self.channel.set_event_handler(None);
        self.channel.detach();
        self.frontend.stop();

        let mut state = self.lock();
        state.suspend.close();
        if state.phase != Phase::Exited {
            state.phase = Phase::Disconnected;
        }
        self.suspended.notify_all();
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Block until the debuggee is suspended, releasing the lock while
    /// waiting.
    pub(crate) fn wait_for_suspend<'a>(
        &'a self,
        state: MutexGuard<'a, SessionState>,
    ) -> Result<MutexGuard<'a, SessionState>, CommandError> {
        let state = handshake::wait_for_suspend(state, &self.suspended, suspend_flags);
        if state.suspend.is_closed() {
            return Err(CommandError::Disposed);
        }
        Ok(state)
    }

    // -----------------------------------------------------------------------
    // Channel events
    // -----------------------------------------------------------------------

    fn handle_event(&self, event: ChannelEvent) {
        if self.is_disposed() {
            return;
        }
        let mut state = self.lock();

        match event {
            ChannelEvent::Started => {
                tracing::info!("Target started");
            }
            ChannelEvent::Ready { process } => {
                tracing::info!("Target ready: process {} ({})", process.id, process.name);
                state.process = Some(process);
            }
            ChannelEvent::Stopped { thread } => {
                self.enter_stopped(&mut state, thread, EventType::DebuggerStep, None);
                tracing::info!("Target stopped");
            }
            ChannelEvent::BreakpointHit { thread } => {
                self.enter_stopped(&mut state, thread, EventType::BreakpointHit, None);
                tracing::info!("Target hit a breakpoint");
            }
            ChannelEvent::ExceptionThrown { thread, unhandled } => {
                let event_type = if unhandled {
                    EventType::UnhandledExceptionThrown
                } else {
                    EventType::HandledExceptionThrown
                };
                let exception = self.channel.exception_info();
                self.enter_stopped(&mut state, thread, event_type, exception);
                if unhandled {
                    tracing::info!("An unhandled exception was thrown");
                } else {
                    tracing::info!("A handled exception was thrown");
                }
            }
            ChannelEvent::Interrupted { thread } => {
                self.enter_stopped(&mut state, thread, EventType::Paused, None);
                tracing::info!("Target interrupted");
            }
            ChannelEvent::Exited => {
                tracing::info!("Target exited");
                state.phase = Phase::Exited;
                state.suspend.signal();
                self.suspended.notify_all();
                self.frontend.send_event(EventType::ProcessExited, json!({}));
                self.frontend.stop();
            }
            ChannelEvent::ThreadStarted(thread) => {
                tracing::info!("Target started a thread: {}", thread.name);
                state.seen_threads.insert(thread.id, thread.name);
                self.frontend
                    .send_event(EventType::ThreadStarted, json!(thread.id));
            }
            ChannelEvent::ThreadStopped(thread) => {
                tracing::info!("Target stopped a thread: {}", thread.name);
                state.seen_threads.remove(&thread.id);
                self.frontend
                    .send_event(EventType::ThreadExited, json!(thread.id));
            }
            ChannelEvent::Output {
                source,
                stderr,
                text,
            } => {
                let text = write_output(source, stderr, &text);
                self.frontend.send_event(
                    EventType::Output,
                    json!({"source": source, "stderr": stderr, "output": text}),
                );
            }
        }
    }

    /// Shared entry into the stopped state.
    fn enter_stopped(
        &self,
        state: &mut SessionState,
        thread: ThreadId,
        event_type: EventType,
        exception: Option<ExceptionInfo>,
    ) {
        state.frames.clear();
        state.variables.clear();
        state.current_exception = None;
        state.stopped_thread = Some(thread);
        state.phase = Phase::Stopped;

        let message = exception.map(|info| {
            state.current_exception = Some(info.instance);
            info.message
        });

        state.suspend.signal();
        self.suspended.notify_all();

        let sent = self.frontend.send_event(
            event_type,
            json!({"thread": thread, "message": message}),
        );
        if !sent {
            tracing::debug!("No client to notify of {:?}", event_type);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.target)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Log one line of channel or debuggee output and return it without the
/// trailing line break.
fn write_output(source: OutputSource, stderr: bool, text: &str) -> &str {
    let text = text.trim_end_matches(['\r', '\n']);
    if stderr {
        tracing::error!("{}: {}", source, text);
    } else {
        tracing::info!("{}: {}", source, text);
    }
    text
}
