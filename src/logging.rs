//! Log file handling and subscriber setup.
//!
//! The library crates only emit `tracing` events; installing a subscriber
//! is left to the embedder, which calls [`init_logging`] once at startup.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use bridge_config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Maximum size of a single log file before rotation (10 MB).
pub const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated log files to retain.
pub const DEFAULT_MAX_LOG_FILES: u32 = 5;

/// Ensure the parent directory of a log file exists.
pub fn ensure_log_dir(log_path: &Path) -> io::Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Rotate log files when the current file exceeds `max_size` bytes.
///
/// ```text
///   debugger.log   → debugger.log.1
///   debugger.log.1 → debugger.log.2
///   …
///   debugger.log.<max_files> is deleted
/// ```
pub fn rotate_log_files(log_path: &Path, max_size: u64, max_files: u32) -> io::Result<()> {
    if !log_path.exists() || fs::metadata(log_path)?.len() < max_size {
        return Ok(());
    }

    let oldest = rotated_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }

    for i in (1..max_files).rev() {
        let from = rotated_path(log_path, i);
        if from.exists() {
            fs::rename(&from, rotated_path(log_path, i + 1))?;
        }
    }

    fs::rename(log_path, rotated_path(log_path, 1))
}

/// Install a global subscriber writing to `config.file`.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    ensure_log_dir(&config.file)
        .with_context(|| format!("cannot create log directory for {}", config.file.display()))?;
    if let Err(e) = rotate_log_files(&config.file, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES) {
        eprintln!("log rotation failed for {}: {}", config.file.display(), e);
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .with_context(|| format!("cannot open log file {}", config.file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))
}

fn rotated_path(base: &Path, index: u32) -> PathBuf {
    let name = base.file_name().unwrap_or_default().to_string_lossy();
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}.{}", name, index))
}
