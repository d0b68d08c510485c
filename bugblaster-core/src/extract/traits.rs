use std::path::Path;

use crate::types::StackFrame;

/// Turns a raw stack trace into frames, most recent call first.
///
/// Implementations must not fail: an unparsable trace yields no frames.
pub trait FrameExtractor: Send + Sync + std::fmt::Debug {
    /// Human-readable name for this extractor.
    fn name(&self) -> &'static str;

    /// Parse the trace text into ordered frames.
    fn extract(&self, trace: &str) -> Vec<StackFrame>;
}

/// Reads a single source line for an explanation.
///
/// Every failure (missing path, unreadable file, out-of-range line) is
/// reported as `None`; readers never propagate I/O errors to the caller.
#[async_trait::async_trait]
pub trait SnippetReader: Send + Sync + std::fmt::Debug {
    /// Return the trimmed text of the 1-based `line` of `file`.
    async fn read_line(&self, file: &Path, line: u32) -> Option<String>;

    /// Blocking variant for contexts without an async runtime (panic hooks).
    fn read_line_blocking(&self, file: &Path, line: u32) -> Option<String>;
}
