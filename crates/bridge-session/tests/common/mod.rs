//! Shared fixtures: a scripted debug channel and a loopback client.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridge_config::Config;
use bridge_frontend::Frontend;
use bridge_protocol::{encode_message, parse_message, FrameBuffer, Message, MessageType};
use bridge_session::{
    Availability, BreakpointHandle, ChannelError, ChannelEvent, DebugChannel, EventHandler,
    ExceptionInfo, FrameLocals, ProcessInfo, RemoteValue, Session, StackFrameInfo, ThreadId,
    ThreadInfo, ValueRef,
};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(5);
pub const QUIET: Duration = Duration::from_millis(300);

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FakeValue {
    pub name: String,
    pub display: String,
    pub type_name: String,
    pub children: Vec<ValueRef>,
    pub availability: Availability,
    pub delay: Duration,
}

impl FakeValue {
    pub fn new(name: &str, display: &str, type_name: &str) -> Self {
        Self {
            name: name.into(),
            display: display.into(),
            type_name: type_name.into(),
            children: Vec::new(),
            availability: Availability::Available,
            delay: Duration::ZERO,
        }
    }

    pub fn with_children(mut self, children: Vec<ValueRef>) -> Self {
        self.children = children;
        self
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn into_ref(self) -> ValueRef {
        Arc::new(self)
    }
}

impl RemoteValue for FakeValue {
    fn name(&self) -> String {
        self.name.clone()
    }
    fn display_value(&self) -> String {
        self.display.clone()
    }
    fn type_name(&self) -> String {
        self.type_name.clone()
    }
    fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
    fn children(&self) -> Vec<ValueRef> {
        self.children.clone()
    }
    fn wait_ready(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
    fn availability(&self) -> Availability {
        self.availability.clone()
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Script {
    running: bool,
    exited: bool,
    ready_process: Option<ProcessInfo>,
    started: Option<SocketAddr>,
    detached: bool,
    calls: Vec<String>,
    active_thread: Option<ThreadInfo>,
    live_threads: Vec<ThreadInfo>,
    frames: HashMap<ThreadId, Vec<StackFrameInfo>>,
    locals: HashMap<(ThreadId, usize), Vec<ValueRef>>,
    receiver: Option<ValueRef>,
    exception: Option<ExceptionInfo>,
    breakpoints: BTreeMap<BreakpointHandle, (PathBuf, i64)>,
    next_breakpoint: BreakpointHandle,
    valid_expressions: HashMap<String, ValueRef>,
}

/// A debug channel driven entirely by the test.
#[derive(Default)]
pub struct FakeChannel {
    script: Mutex<Script>,
    handler: Mutex<Option<EventHandler>>,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Report this process as ready shortly after `start`.
    pub fn ready_with(&self, process: ProcessInfo) {
        self.script().ready_process = Some(process);
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Deliver an event as the channel's own thread would.
    pub fn emit(&self, event: ChannelEvent) {
        let handler = self.handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }

    /// Suspend the debuggee on `thread` because of a breakpoint.
    pub fn hit_breakpoint(&self, thread: ThreadId) {
        {
            let mut script = self.script();
            script.running = false;
            script.active_thread = Some(ThreadInfo::new(thread, format!("thread-{thread}")));
        }
        self.emit(ChannelEvent::BreakpointHit { thread });
    }

    /// Suspend the debuggee on `thread` with a pending exception.
    pub fn throw(&self, thread: ThreadId, message: &str, unhandled: bool) {
        {
            let mut script = self.script();
            script.running = false;
            script.active_thread = Some(ThreadInfo::new(thread, format!("thread-{thread}")));
            script.exception = Some(ExceptionInfo {
                message: message.into(),
                instance: FakeValue::new("$exception", "{System.Exception}", "System.Exception")
                    .into_ref(),
            });
        }
        self.emit(ChannelEvent::ExceptionThrown { thread, unhandled });
    }

    pub fn exit(&self) {
        {
            let mut script = self.script();
            script.running = false;
            script.exited = true;
        }
        self.emit(ChannelEvent::Exited);
    }

    pub fn set_frames(&self, thread: ThreadId, frames: Vec<StackFrameInfo>) {
        self.script().frames.insert(thread, frames);
    }

    pub fn set_locals(&self, thread: ThreadId, index: usize, values: Vec<ValueRef>) {
        self.script().locals.insert((thread, index), values);
    }

    pub fn set_receiver(&self, value: ValueRef) {
        self.script().receiver = Some(value);
    }

    pub fn set_live_threads(&self, threads: Vec<ThreadInfo>) {
        self.script().live_threads = threads;
    }

    pub fn allow_expression(&self, expression: &str, value: ValueRef) {
        self.script()
            .valid_expressions
            .insert(expression.into(), value);
    }

    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.script().calls.iter().any(|c| c == name)
    }

    pub fn breakpoint_lines(&self, file: &Path) -> Vec<i64> {
        let mut lines: Vec<i64> = self
            .script()
            .breakpoints
            .values()
            .filter(|(f, _)| f == file)
            .map(|(_, l)| *l)
            .collect();
        lines.sort();
        lines
    }

    pub fn breakpoint_count(&self) -> usize {
        self.script().breakpoints.len()
    }

    pub fn is_detached(&self) -> bool {
        self.script().detached
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }

    fn record(&self, call: &str) {
        self.script().calls.push(call.into());
    }

    fn resume_as(&self, call: &str) -> Result<(), ChannelError> {
        let mut script = self.script();
        script.calls.push(call.into());
        script.running = true;
        Ok(())
    }
}

impl DebugChannel for FakeChannel {
    fn start(&self, target: SocketAddr) -> Result<(), ChannelError> {
        let process = {
            let mut script = self.script();
            script.started = Some(target);
            script.running = true;
            script.ready_process.clone()
        };

        if let Some(process) = process {
            let handler = self.handler.lock().unwrap().clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(5));
                if let Some(handler) = handler {
                    handler(ChannelEvent::Started);
                    handler(ChannelEvent::Ready { process });
                }
            });
        }
        Ok(())
    }

    fn set_event_handler(&self, handler: Option<EventHandler>) {
        *self.handler.lock().unwrap() = handler;
    }

    fn is_running(&self) -> bool {
        self.script().running
    }

    fn has_exited(&self) -> bool {
        self.script().exited
    }

    fn next_line(&self) -> Result<(), ChannelError> {
        self.resume_as("next_line")
    }

    fn step_line(&self) -> Result<(), ChannelError> {
        self.resume_as("step_line")
    }

    fn finish(&self) -> Result<(), ChannelError> {
        self.resume_as("finish")
    }

    fn resume(&self) -> Result<(), ChannelError> {
        self.resume_as("resume")
    }

    fn stop(&self) -> Result<(), ChannelError> {
        self.record("stop");
        Ok(())
    }

    fn active_thread(&self) -> Option<ThreadInfo> {
        self.script().active_thread.clone()
    }

    fn set_active_thread(&self, thread: ThreadId) -> Result<(), ChannelError> {
        let mut script = self.script();
        if !script.frames.contains_key(&thread) {
            return Err(ChannelError::UnknownThread(thread));
        }
        script.calls.push(format!("set_active_thread {thread}"));
        script.active_thread = Some(ThreadInfo::new(thread, format!("thread-{thread}")));
        Ok(())
    }

    fn threads(&self, _process: &ProcessInfo) -> Result<Vec<ThreadInfo>, ChannelError> {
        Ok(self.script().live_threads.clone())
    }

    fn frame_count(&self, thread: ThreadId) -> Result<usize, ChannelError> {
        Ok(self.script().frames.get(&thread).map_or(0, Vec::len))
    }

    fn frames(
        &self,
        thread: ThreadId,
        start: usize,
        count: usize,
    ) -> Result<Vec<StackFrameInfo>, ChannelError> {
        let script = self.script();
        let frames = script.frames.get(&thread).cloned().unwrap_or_default();
        Ok(frames.into_iter().skip(start).take(count).collect())
    }

    fn frame_locals(&self, frame: &StackFrameInfo) -> Result<FrameLocals, ChannelError> {
        let script = self.script();
        Ok(FrameLocals {
            this: script.receiver.clone(),
            parameters: Vec::new(),
            locals: script
                .locals
                .get(&(frame.thread, frame.index))
                .cloned()
                .unwrap_or_default(),
        })
    }

    fn exception_info(&self) -> Option<ExceptionInfo> {
        self.script().exception.clone()
    }

    fn insert_breakpoint(&self, file: &Path, line: i64) -> Result<BreakpointHandle, ChannelError> {
        let mut script = self.script();
        script.next_breakpoint += 1;
        let handle = script.next_breakpoint;
        script
            .breakpoints
            .insert(handle, (file.to_path_buf(), line));
        Ok(handle)
    }

    fn remove_breakpoint(&self, handle: BreakpointHandle) -> Result<(), ChannelError> {
        self.script().breakpoints.remove(&handle);
        Ok(())
    }

    fn validate_expression(&self, _frame: &StackFrameInfo, expression: &str) -> bool {
        self.script().valid_expressions.contains_key(expression)
    }

    fn evaluate(&self, _frame: &StackFrameInfo, expression: &str) -> Result<ValueRef, ChannelError> {
        self.script()
            .valid_expressions
            .get(expression)
            .cloned()
            .ok_or_else(|| ChannelError::Failed(format!("cannot evaluate {expression}")))
    }

    fn detach(&self) {
        let mut script = self.script();
        script.detached = true;
        script.running = false;
    }
}

pub fn frame(thread: ThreadId, index: usize, method: &str, file: Option<&Path>, line: i64) -> StackFrameInfo {
    StackFrameInfo {
        thread,
        index,
        method: method.into(),
        file: file.map(Path::to_path_buf),
        line,
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct Client {
    stream: TcpStream,
    frames: FrameBuffer,
    pending: VecDeque<Message>,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
            frames: FrameBuffer::new(),
            pending: VecDeque::new(),
        }
    }

    pub async fn request(&mut self, command: &str, args: Value) {
        let bytes = encode_message(&Message::request(command, args)).unwrap();
        self.stream.write_all(&bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    async fn read_message(&mut self) -> Message {
        loop {
            if let Some(frame) = self.frames.next_frame().unwrap() {
                return parse_message(&frame).unwrap();
            }
            let mut chunk = [0u8; 1024];
            let n = self.stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed");
            self.frames.append(&chunk[..n]);
        }
    }

    async fn next_of(&mut self, kind: MessageType) -> Message {
        if let Some(pos) = self.pending.iter().position(|m| m.message_type == kind) {
            return self.pending.remove(pos).unwrap();
        }
        loop {
            let message = self.read_message().await;
            if message.message_type == kind {
                return message;
            }
            self.pending.push_back(message);
        }
    }

    /// Next response body, setting aside any events received first.
    pub async fn response(&mut self) -> Value {
        tokio::time::timeout(WAIT, self.next_of(MessageType::Response))
            .await
            .expect("timed out waiting for a response")
            .body
    }

    /// Next event body, setting aside any responses received first.
    pub async fn event(&mut self) -> Value {
        tokio::time::timeout(WAIT, self.next_of(MessageType::Event))
            .await
            .expect("timed out waiting for an event")
            .body
    }

    /// Send a request and return its response body.
    pub async fn call(&mut self, command: &str, args: Value) -> Value {
        self.request(command, args).await;
        self.response().await
    }

    /// Assert nothing of `kind` arrives for a short while.
    pub async fn expect_no(&mut self, kind: MessageType) {
        assert!(
            !self.pending.iter().any(|m| m.message_type == kind),
            "unexpected pending {:?}",
            kind
        );
        let result = tokio::time::timeout(QUIET, self.next_of(kind)).await;
        assert!(result.is_err(), "unexpected message: {:?}", result);
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub channel: Arc<FakeChannel>,
    pub session: Arc<Session>,
    pub frontend: Arc<Frontend>,
    pub client: Client,
    pub frontend_task: JoinHandle<Result<(), bridge_frontend::FrontendError>>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.attach.max_attempts = 20;
    config.attach.interval_ms = 10;
    config
}

pub fn target() -> SocketAddr {
    "127.0.0.1:55555".parse().unwrap()
}

pub fn process() -> ProcessInfo {
    ProcessInfo {
        id: 4242,
        name: "Game".into(),
    }
}

/// Attach a session to a fresh fake channel and connect a client.
pub async fn attached() -> Harness {
    attached_with(test_config()).await
}

pub async fn attached_with(config: Config) -> Harness {
    let channel = FakeChannel::new();
    channel.ready_with(process());

    let frontend = Arc::new(Frontend::new("127.0.0.1:0".parse().unwrap(), 512));
    let addr = frontend.listen().await.unwrap();
    let dyn_channel: Arc<dyn DebugChannel> = channel.clone();
    let session = Session::new(dyn_channel, Arc::clone(&frontend), target(), &config);
    session.attach().await.unwrap();

    let frontend_task = tokio::spawn(Arc::clone(&frontend).run());
    let client = Client::connect(addr).await;
    tokio::time::timeout(WAIT, async {
        while !frontend.is_connected() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("client never registered");

    Harness {
        channel,
        session,
        frontend,
        client,
        frontend_task,
    }
}
