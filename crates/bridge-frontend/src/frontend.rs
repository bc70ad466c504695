//! Loopback TCP server that speaks the bridge protocol to one client.
//!
//! The accept loop serves a single client at a time. Inbound bytes are
//! framed by bracket balance, parsed, and dispatched through the shared
//! [`CommandTable`]. Responses and events go out through the active
//! [`Connection`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bridge_protocol::{
    encode_message, parse_message, Args, ErrorBody, EventType, FrameBuffer, Message, Request,
};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::command::{CommandFailure, CommandHandler, CommandResult, CommandTable};
use crate::connection::Connection;
use crate::error::FrontendError;

/// The client-facing server.
pub struct Frontend {
    addr: SocketAddr,
    read_chunk_size: usize,
    commands: Arc<CommandTable>,
    running: AtomicBool,
    listener: Mutex<Option<TcpListener>>,
    connection: Mutex<Option<Connection>>,
    shutdown: watch::Sender<bool>,
}

impl Frontend {
    /// Create a frontend that will listen on `addr`.
    pub fn new(addr: SocketAddr, read_chunk_size: usize) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            addr,
            read_chunk_size: read_chunk_size.max(1),
            commands: Arc::new(CommandTable::new()),
            running: AtomicBool::new(false),
            listener: Mutex::new(None),
            connection: Mutex::new(None),
            shutdown,
        }
    }

    /// The shared command table.
    pub fn commands(&self) -> &Arc<CommandTable> {
        &self.commands
    }

    /// Register every command `handler` provides.
    ///
    /// Commands are keyed by name; a later registration replaces an earlier
    /// one under the same name.
    pub fn set_handler(&self, handler: &dyn CommandHandler) {
        let handler_name = handler.handler_name().to_string();
        for (name, callback) in handler.commands() {
            let owner = format!("{}::{}", handler_name, name);
            self.commands.set(name, &owner, callback);
        }
    }

    /// Bind the listening socket without starting the accept loop.
    ///
    /// Returns the bound address, which differs from the configured one
    /// when port 0 was requested.
    pub async fn listen(&self) -> Result<SocketAddr, FrontendError> {
        let bound = self.lock_listener().as_ref().map(TcpListener::local_addr);
        if let Some(local) = bound {
            return Ok(local?);
        }

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| FrontendError::Bind {
                addr: self.addr,
                source,
            })?;
        let local = listener.local_addr()?;
        tracing::info!("Frontend listening on {}", local);
        *self.lock_listener() = Some(listener);
        Ok(local)
    }

    /// Accept and serve clients until [`stop`](Self::stop) is called.
    ///
    /// Calling `run` while already running returns immediately, as does
    /// calling it after `stop`.
    pub async fn run(self: Arc<Self>) -> Result<(), FrontendError> {
        if self.is_stopped() {
            tracing::info!("Frontend was stopped before it ran");
            return Ok(());
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.accept_loop().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn accept_loop(&self) -> Result<(), FrontendError> {
        let mut shutdown = self.shutdown.subscribe();
        self.listen().await?;
        let listener = self.lock_listener().take();
        let Some(listener) = listener else {
            return Ok(());
        };

        loop {
            let accepted = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    tracing::info!("Client connected from {}", peer);
                    self.serve(stream, peer, &mut shutdown).await;
                    tracing::info!("Client {} disconnected", peer);
                }
                Err(e) => {
                    tracing::error!("Accept failed: {}", e);
                }
            }
        }

        tracing::info!("Frontend stopped");
        Ok(())
    }

    /// Stop accepting clients and close the active connection.
    ///
    /// The stop is permanent: a `run` that has not started yet returns
    /// without serving.
    pub fn stop(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        tracing::info!("Stopping frontend");
        self.lock_listener().take();
        if let Some(mut connection) = self.lock_connection().take() {
            connection.dispose();
        }
    }

    /// Whether the accept loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.is_stopped()
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Whether a client is currently connected.
    pub fn is_connected(&self) -> bool {
        self.lock_connection().is_some()
    }

    /// Send an event to the connected client.
    ///
    /// Returns `false` when no client is connected or the event type has no
    /// category.
    pub fn send_event(&self, event_type: EventType, context: Value) -> bool {
        let Some(message) = Message::event(event_type, context) else {
            tracing::warn!("Event {:?} has no category - not sent", event_type);
            return false;
        };
        self.send_message(&message)
    }

    /// Encode and send one message to the connected client.
    pub fn send_message(&self, message: &Message) -> bool {
        let bytes = match encode_message(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to encode message: {}", e);
                return false;
            }
        };

        match self.lock_connection().as_ref() {
            Some(connection) => connection.send(bytes),
            None => false,
        }
    }

    async fn serve(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        let (reader, writer) = stream.into_split();
        *self.lock_connection() = Some(Connection::open(peer, writer));

        tokio::select! {
            _ = wait_for_shutdown(shutdown) => {}
            _ = self.read_loop(reader) => {}
        }

        if let Some(mut connection) = self.lock_connection().take() {
            connection.dispose();
        }
    }

    async fn read_loop(&self, mut reader: OwnedReadHalf) {
        let mut frames = FrameBuffer::new();
        let mut chunk = vec![0u8; self.read_chunk_size];

        loop {
            let n = match reader.read(&mut chunk).await {
                Ok(0) => return,
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!("Read failed: {}", e);
                    return;
                }
            };
            frames.append(&chunk[..n]);

            loop {
                match frames.next_frame() {
                    Ok(Some(frame)) => {
                        if !self.handle_frame(&frame).await {
                            frames.clear();
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Discarding receive buffer: {}", e);
                        break;
                    }
                }
            }
        }
    }

    /// Returns `false` when the frame is not a valid request.
    async fn handle_frame(&self, frame: &[u8]) -> bool {
        tracing::debug!("Received message: {}", String::from_utf8_lossy(frame));

        let request = match parse_message(frame).and_then(Message::into_request) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Discarding receive buffer: {}", e);
                return false;
            }
        };
        self.respond(request).await;
        true
    }

    async fn respond(&self, request: Request) {
        let command = request.command;
        let Some(result) = self.dispatch(command.clone(), Args::new(request.args)).await else {
            return;
        };

        let response = match result {
            Ok(Some(body)) => Message::response(body),
            Ok(None) => return,
            Err(failure) => {
                tracing::error!(
                    "Command {} failed: {}: {}",
                    command,
                    failure.exception,
                    failure.message
                );
                let body = ErrorBody::from(failure);
                match serde_json::to_value(body) {
                    Ok(body) => Message::response(body),
                    Err(e) => {
                        tracing::error!("Failed to encode error body: {}", e);
                        return;
                    }
                }
            }
        };

        if !self.send_message(&response) {
            tracing::warn!("Response to {} was not sent", command);
        }
    }

    /// Run the handler off the async workers; handlers may block on the
    /// debuggee.
    async fn dispatch(&self, command: String, args: Args) -> Option<CommandResult> {
        let commands = Arc::clone(&self.commands);
        let name = command.clone();
        match tokio::task::spawn_blocking(move || commands.call(&name, args)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Command {} panicked: {}", command, e);
                Some(Err(CommandFailure::new("panic", e.to_string())))
            }
        }
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<TcpListener>> {
        self.listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_connection(&self) -> std::sync::MutexGuard<'_, Option<Connection>> {
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Frontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontend")
            .field("addr", &self.addr)
            .field("running", &self.is_running())
            .field("commands", &self.commands)
            .finish()
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
