use serde::{Deserialize, Serialize};

/// Sentinel location used when no stack frame names a source file.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Message substituted for errors that carry no text.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Prefix applied to rejected futures that escaped request handling.
pub const UNHANDLED_REJECTION: &str = "Unhandled Rejection";

// ── Raised errors ──────────────────────────────────────────────────

/// The minimal shape of an error handed to BugBlaster: its message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaisedError {
    pub message: String,
}

impl RaisedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Capture the display text of any standard error.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(err.to_string())
    }

    /// Wrap the reason of a rejected future: `Unhandled Rejection: {reason}`.
    pub fn rejection(reason: impl std::fmt::Display) -> Self {
        Self::new(format!("{UNHANDLED_REJECTION}: {reason}"))
    }

    /// Message text, with [`UNKNOWN_ERROR`] standing in for an empty message.
    pub fn text(&self) -> &str {
        if self.message.trim().is_empty() {
            UNKNOWN_ERROR
        } else {
            &self.message
        }
    }
}

impl std::fmt::Display for RaisedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

// ── Stack frames ───────────────────────────────────────────────────

/// One entry of a call-stack trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackFrame {
    /// Source file path, if the trace named one.
    pub file: Option<String>,
    /// 1-based line number.
    pub line: Option<u32>,
    /// 1-based column number.
    pub column: Option<u32>,
    /// Enclosing function name.
    pub function: Option<String>,
}

impl StackFrame {
    pub fn new(file: impl Into<String>, line: u32, function: Option<&str>) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
            column: None,
            function: function.map(str::to_string),
        }
    }

    /// Function name, or `"anonymous"` when the trace did not name one.
    pub fn function_name(&self) -> &str {
        self.function.as_deref().unwrap_or("anonymous")
    }
}

impl std::fmt::Display for StackFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{file}:{line}"),
            (Some(file), None) => f.write_str(file),
            (None, _) => f.write_str(self.function_name()),
        }
    }
}

// ── Request context ────────────────────────────────────────────────

/// Metadata about the request that was being served when the error surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    /// Whether a request body was parsed before the failing handler ran.
    pub has_body: bool,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>, has_body: bool) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            has_body,
        }
    }

    /// Bracketed `[METHOD /path]` tag, or `None` when either part is blank.
    pub fn tag(&self) -> Option<String> {
        if self.method.is_empty() || self.path.is_empty() {
            return None;
        }
        Some(format!("[{} {}]", self.method, self.path))
    }
}

// ── Engine output ──────────────────────────────────────────────────

/// Heuristic diagnosis of a single error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    /// One sentence stating the inferred cause.
    pub reason: String,
    /// Remediation guidance.
    pub tip: String,
    /// `file:line (in function)` or [`UNKNOWN_LOCATION`], plus optional
    /// snippet and request suffixes.
    pub location: String,
    /// `Full stack: a:1 -> b:2`, present when more than one frame exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// Persistable unit appended to a log store.
///
/// Field names and order are the on-disk contract of existing log archives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    pub location: String,
    /// Absent from archives written before tips and reasons were stored.
    #[serde(default)]
    pub tip: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub timestamp: String,
}
