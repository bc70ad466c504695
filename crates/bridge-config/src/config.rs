use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Log verbosity level.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug messages.
    Debug,
    /// Informational messages (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing-subscriber`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How the bridge attaches to the debuggee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachConfig {
    /// Polls for the debuggee's ready signal before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between polls, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    50
}
fn default_interval_ms() -> u64 {
    500
}

impl AttachConfig {
    /// Delay between polls.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

/// Client-facing socket settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Loopback address to listen on.
    #[serde(default = "default_host")]
    pub host: String,
    /// The frontend listens on the debuggee port plus this offset.
    #[serde(default = "default_port_offset")]
    pub port_offset: u16,
    /// Size of each socket read, in bytes.
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port_offset() -> u16 {
    1
}
fn default_read_chunk_size() -> usize {
    512
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port_offset: default_port_offset(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

/// Command handling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File extensions (without the dot) that may carry breakpoints.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
    /// Frames returned by `stackTrace` when the client gives no `levels`.
    #[serde(default = "default_stack_levels")]
    pub default_stack_levels: u32,
    /// Maximum variables returned by one `variables` call.
    #[serde(default = "default_max_variable_children")]
    pub max_variable_children: usize,
    /// Variable sets up to this size wait on their values in parallel.
    #[serde(default = "default_parallel_wait_threshold")]
    pub parallel_wait_threshold: usize,
    /// Initial client line base, until `setSettings` says otherwise.
    #[serde(default = "default_lines_start_at")]
    pub lines_start_at: i64,
    /// Initial path mode, until `setSettings` says otherwise.
    #[serde(default)]
    pub use_uri: bool,
}

fn default_source_extensions() -> Vec<String> {
    vec!["cs".to_string()]
}
fn default_stack_levels() -> u32 {
    10
}
fn default_max_variable_children() -> usize {
    100
}
fn default_parallel_wait_threshold() -> usize {
    20
}
fn default_lines_start_at() -> i64 {
    1
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source_extensions: default_source_extensions(),
            default_stack_levels: default_stack_levels(),
            max_variable_children: default_max_variable_children(),
            parallel_wait_threshold: default_parallel_wait_threshold(),
            lines_start_at: default_lines_start_at(),
            use_uri: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_log_file() -> PathBuf {
    PathBuf::from("assets/logs/debugger.log")
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: default_log_file(),
        }
    }
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Attach retry budget.
    #[serde(default)]
    pub attach: AttachConfig,
    /// Client socket.
    #[serde(default)]
    pub frontend: FrontendConfig,
    /// Command handling.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}
