//! Response bodies sent to the client.

use std::path::Path;

use serde::Serialize;

use crate::channel::{Handle, ValueRef};
use crate::registry::ObjectRegistry;
use crate::settings::ClientSettings;

/// Placeholder source reference for files the client cannot open.
pub const MISSING_SOURCE_REFERENCE: i32 = 1000;

/// A frame's source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBody {
    /// File name without directories.
    pub name: String,
    /// Client path, when the file exists.
    pub path: Option<String>,
    /// Non-zero when the client has no path to open.
    pub source_reference: i32,
    /// `"normal"` or `"deemphasize"`.
    pub presentation_hint: &'static str,
}

impl SourceBody {
    /// Describe `file` for a stack frame.
    ///
    /// Returns the source (if the frame has one) and the frame's hint.
    pub fn describe(
        settings: &ClientSettings,
        file: Option<&Path>,
    ) -> (Option<SourceBody>, &'static str) {
        let Some(file) = file.filter(|f| !f.as_os_str().is_empty()) else {
            return (None, "subtle");
        };
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if settings.absolute(file).is_file() {
            let source = SourceBody {
                name,
                path: settings.to_client_path(file),
                source_reference: 0,
                presentation_hint: "normal",
            };
            (Some(source), "normal")
        } else {
            let source = SourceBody {
                name,
                path: None,
                source_reference: MISSING_SOURCE_REFERENCE,
                presentation_hint: "deemphasize",
            };
            (Some(source), "subtle")
        }
    }
}

/// One stack frame.
#[derive(Debug, Clone, Serialize)]
pub struct StackFrameBody {
    /// Frame handle.
    pub id: Handle,
    /// Method name.
    pub name: String,
    /// Source file.
    pub source: Option<SourceBody>,
    /// Line in client numbering.
    pub line: i64,
    /// Always 0.
    pub column: i64,
    /// `"normal"` or `"subtle"`.
    pub hint: &'static str,
}

/// `stackTrace` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceBody {
    /// Frames returned.
    pub stack_frames: Vec<StackFrameBody>,
    /// Depth of the whole backtrace.
    pub total_frame_count: usize,
}

/// One variable scope of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeBody {
    /// `"Exception"` or `"Local"`.
    pub name: &'static str,
    /// Variable-set handle.
    pub variable_set_id: Handle,
    /// Whether fetching the scope is slow.
    pub expensive: bool,
}

/// One variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableBody {
    /// Variable name.
    pub name: String,
    /// Rendered value.
    pub value: String,
    /// Type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Variable-set handle of the members, 0 when none.
    pub children_set_id: Handle,
}

impl VariableBody {
    /// Describe a ready value, registering its members when it has any.
    pub fn describe(value: &ValueRef, registry: &mut ObjectRegistry<Vec<ValueRef>>) -> Self {
        let children_set_id = if value.has_children() {
            registry.insert(value.children())
        } else {
            0
        };
        Self {
            name: value.name(),
            value: strip_braces(&value.display_value()).to_string(),
            type_name: value.type_name(),
            children_set_id,
        }
    }
}

/// `variables` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesBody {
    /// Variables returned.
    pub variables: Vec<VariableBody>,
    /// Whether the set continues past the returned variables.
    pub more_exist: bool,
}

/// One breakpoint acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakpointBody {
    /// Bridge-assigned ID.
    pub id: u64,
    /// Always true for acknowledged lines.
    pub installed: bool,
    /// Line in client numbering.
    pub line: i64,
}

/// `setBreakpoints` response.
#[derive(Debug, Clone, Serialize)]
pub struct BreakpointsBody {
    /// One entry per requested line.
    pub breakpoints: Vec<BreakpointBody>,
}

/// `evaluate` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateBody {
    /// Rendered result.
    pub result: String,
    /// Type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Variable-set handle of the members, 0 when none.
    pub children_set_id: Handle,
}

/// `{Name = "x"}` renders as `Name = "x"`.
fn strip_braces(display: &str) -> &str {
    if display.len() > 1 && display.starts_with('{') && display.ends_with('}') {
        &display[1..display.len() - 1]
    } else {
        display
    }
}
