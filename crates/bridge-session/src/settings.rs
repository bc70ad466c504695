//! Client line-numbering and path conventions.

use std::path::{Path, PathBuf};

use bridge_protocol::Args;
use url::Url;

use crate::error::CommandError;

/// First line number in debugger numbering.
pub const DEBUGGER_LINE_START: i64 = 1;

/// How the client numbers lines and names files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Whether paths travel as `file://` URIs.
    pub use_uri: bool,
    /// The client's first line number.
    pub line_start: i64,
    base_dir: PathBuf,
}

impl ClientSettings {
    /// Settings resolving relative paths against `base_dir`.
    pub fn new(use_uri: bool, line_start: i64, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            use_uri,
            line_start,
            base_dir: base_dir.into(),
        }
    }

    /// Settings resolving relative paths against the process working
    /// directory.
    pub fn from_current_dir(use_uri: bool, line_start: i64) -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|e| {
            tracing::warn!("Cannot read working directory: {}", e);
            PathBuf::from(".")
        });
        Self::new(use_uri, line_start, base_dir)
    }

    /// Apply a `setSettings` request. Absent fields keep their value.
    pub fn apply(&mut self, args: &Args) {
        self.use_uri = args.bool_or("useURI", self.use_uri);
        self.line_start = args.i64_or("lineStart", self.line_start);
        tracing::info!(
            "Client settings: useURI = {}, lineStart = {}",
            self.use_uri,
            self.line_start
        );
    }

    fn line_offset(&self) -> i64 {
        DEBUGGER_LINE_START - self.line_start
    }

    /// Convert a debugger line to client numbering.
    pub fn to_client_line(&self, line: i64) -> i64 {
        line - self.line_offset()
    }

    /// Convert a client line to debugger numbering.
    pub fn to_debugger_line(&self, line: i64) -> i64 {
        line + self.line_offset()
    }

    /// `path` made absolute against the base directory.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Render a debugger path for the client.
    ///
    /// Returns `None` when the path cannot be expressed as a URI.
    pub fn to_client_path(&self, path: &Path) -> Option<String> {
        let absolute = self.absolute(path);
        if self.use_uri {
            Url::from_file_path(&absolute).ok().map(String::from)
        } else {
            Some(absolute.display().to_string())
        }
    }

    /// Interpret a client path.
    ///
    /// URI mode requires an absolute `file:` URI. Filesystem mode stores
    /// paths relative to the base directory when they lie beneath it.
    pub fn to_debugger_path(&self, path: &str) -> Result<PathBuf, CommandError> {
        if self.use_uri {
            let url = Url::parse(path).map_err(|_| CommandError::MalformedUri(path.to_string()))?;
            if url.scheme() != "file" {
                return Err(CommandError::MalformedUri(path.to_string()));
            }
            url.to_file_path()
                .map_err(|()| CommandError::MalformedUri(path.to_string()))
        } else {
            let path = Path::new(path);
            Ok(path
                .strip_prefix(&self.base_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf()))
        }
    }
}
