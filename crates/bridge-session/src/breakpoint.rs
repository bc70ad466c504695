//! Breakpoint bookkeeping and full-replace reconciliation per file.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::channel::{BreakpointHandle, ChannelError};

/// A breakpoint installed in the debuggee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointRecord {
    /// Bridge-assigned ID.
    pub id: u64,
    /// Line in debugger numbering.
    pub line: i64,
    /// Channel-side handle, used for removal.
    pub handle: BreakpointHandle,
}

/// Outcome for one requested line, in debugger numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    /// Breakpoint ID covering the line.
    pub id: u64,
    /// The requested line.
    pub line: i64,
}

/// Breakpoints grouped by source file.
#[derive(Debug)]
pub struct BreakpointTable {
    files: HashMap<PathBuf, Vec<BreakpointRecord>>,
    next_id: u64,
}

impl Default for BreakpointTable {
    fn default() -> Self {
        Self {
            files: HashMap::new(),
            next_id: 1,
        }
    }
}

impl BreakpointTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installed breakpoints for `file`.
    pub fn get_for_file(&self, file: &Path) -> &[BreakpointRecord] {
        self.files.get(file).map_or(&[], |v| v.as_slice())
    }

    /// Total installed breakpoints across all files.
    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Whether no breakpoints are installed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the installed set for `file` equal to `lines`.
    ///
    /// Lines already installed are kept, installed lines not requested are
    /// removed through `uninstall`, and missing lines are installed through
    /// `install` and given fresh IDs. Returns one entry per requested line,
    /// duplicates included, in request order.
    ///
    /// A failed removal is logged and the record is dropped anyway. A failed
    /// install aborts with the error; breakpoints placed so far stay
    /// recorded.
    pub fn reconcile<I, U>(
        &mut self,
        file: &Path,
        lines: &[i64],
        mut install: I,
        mut uninstall: U,
    ) -> Result<Vec<Placed>, ChannelError>
    where
        I: FnMut(&Path, i64) -> Result<BreakpointHandle, ChannelError>,
        U: FnMut(BreakpointHandle) -> Result<(), ChannelError>,
    {
        let requested: BTreeSet<i64> = lines.iter().copied().collect();
        let existing = self.files.remove(file).unwrap_or_default();

        let mut kept = Vec::with_capacity(requested.len());
        for record in existing {
            if requested.contains(&record.line) {
                kept.push(record);
                continue;
            }
            tracing::info!(
                "Removing breakpoint {} at {}:{}",
                record.id,
                file.display(),
                record.line
            );
            if let Err(e) = uninstall(record.handle) {
                tracing::warn!("Failed to remove breakpoint {}: {}", record.id, e);
            }
        }

        let mut result = Ok(());
        for &line in &requested {
            if kept.iter().any(|r| r.line == line) {
                continue;
            }
            match install(file, line) {
                Ok(handle) => {
                    let id = self.next_id;
                    self.next_id += 1;
                    tracing::info!("Breakpoint {} set at {}:{}", id, file.display(), line);
                    kept.push(BreakpointRecord { id, line, handle });
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to set breakpoint at {}:{}: {}",
                        file.display(),
                        line,
                        e
                    );
                    result = Err(e);
                    break;
                }
            }
        }

        kept.sort_by_key(|r| r.line);
        let placed = lines
            .iter()
            .filter_map(|&line| {
                kept.iter()
                    .find(|r| r.line == line)
                    .map(|r| Placed { id: r.id, line })
            })
            .collect();

        if !kept.is_empty() {
            self.files.insert(file.to_path_buf(), kept);
        }
        result.map(|()| placed)
    }
}

/// Whether `file` has one of the managed source `extensions`.
pub fn is_managed_source(file: &Path, extensions: &[String]) -> bool {
    file.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
