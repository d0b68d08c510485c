// Source snippet retrieval. Every failure degrades to `None` so that an
// unreadable file never disturbs handling of the error being explained.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::SnippetSection;

use super::traits::SnippetReader;

/// Reads snippets from the local filesystem with bounded size and latency.
#[derive(Debug, Clone)]
pub struct FsSnippetReader {
    timeout: Duration,
    max_file_bytes: u64,
}

impl Default for FsSnippetReader {
    fn default() -> Self {
        Self::from_config(&SnippetSection::default())
    }
}

impl FsSnippetReader {
    pub fn new(timeout: Duration, max_file_bytes: u64) -> Self {
        Self {
            timeout,
            max_file_bytes,
        }
    }

    pub fn from_config(section: &SnippetSection) -> Self {
        Self::new(
            Duration::from_millis(section.read_timeout_ms),
            section.max_file_bytes,
        )
    }

    async fn read_bounded(&self, file: &Path) -> std::io::Result<Option<String>> {
        let meta = tokio::fs::metadata(file).await?;
        if !self.within_size_limit(file, meta.len()) {
            return Ok(None);
        }
        let bytes = tokio::fs::read(file).await?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn read_bounded_blocking(&self, file: &Path) -> std::io::Result<Option<String>> {
        let meta = std::fs::metadata(file)?;
        if !self.within_size_limit(file, meta.len()) {
            return Ok(None);
        }
        let bytes = std::fs::read(file)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn report_timeout(&self, file: &Path) {
        warn!(
            path = %file.display(),
            timeout = ?self.timeout,
            "[BugBlaster] Timed out reading source file"
        );
    }

    fn within_size_limit(&self, file: &Path, len: u64) -> bool {
        if len > self.max_file_bytes {
            debug!(
                path = %file.display(),
                len,
                limit = self.max_file_bytes,
                "Source file too large for snippet"
            );
            return false;
        }
        true
    }
}

#[async_trait::async_trait]
impl SnippetReader for FsSnippetReader {
    async fn read_line(&self, file: &Path, line: u32) -> Option<String> {
        match tokio::time::timeout(self.timeout, self.read_bounded(file)).await {
            Ok(read) => settle(file, line, read),
            Err(_) => {
                self.report_timeout(file);
                None
            }
        }
    }

    /// The read runs on a helper thread so a stalled file (FIFO, hung
    /// network mount) costs at most the configured timeout.
    fn read_line_blocking(&self, file: &Path, line: u32) -> Option<String> {
        let (tx, rx) = mpsc::channel();
        let reader = self.clone();
        let path = file.to_path_buf();
        let spawned = std::thread::Builder::new()
            .name("bugblaster-snippet".into())
            .spawn(move || {
                // The receiver is gone once the caller timed out.
                let _ = tx.send(reader.read_bounded_blocking(&path));
            });
        if let Err(e) = spawned {
            report_io_failure(file, &e);
            return None;
        }

        match rx.recv_timeout(self.timeout) {
            Ok(read) => settle(file, line, read),
            Err(RecvTimeoutError::Timeout) => {
                self.report_timeout(file);
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn settle(file: &Path, line: u32, read: std::io::Result<Option<String>>) -> Option<String> {
    match read {
        Ok(Some(content)) => line_at(&content, line),
        Ok(None) => None,
        Err(e) => {
            report_io_failure(file, &e);
            None
        }
    }
}

/// A missing file is the common case (frames inside dependencies or
/// runtime internals) and is not worth a warning.
fn report_io_failure(file: &Path, err: &std::io::Error) {
    if err.kind() == std::io::ErrorKind::NotFound {
        debug!(path = %file.display(), "Source file not found");
    } else {
        warn!(path = %file.display(), error = %err, "[BugBlaster] Couldn't read file");
    }
}

/// Trimmed text of the 1-based `line`, or `None` when out of range or blank.
pub fn line_at(content: &str, line: u32) -> Option<String> {
    let idx = usize::try_from(line).ok()?.checked_sub(1)?;
    let text = content.lines().nth(idx)?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// In-memory snippet source keyed by `(path, line)`.
#[derive(Debug, Default, Clone)]
pub struct StaticSnippetReader {
    lines: HashMap<(PathBuf, u32), String>,
}

impl StaticSnippetReader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_line(mut self, file: impl Into<PathBuf>, line: u32, text: &str) -> Self {
        self.lines.insert((file.into(), line), text.trim().to_string());
        self
    }

    fn lookup(&self, file: &Path, line: u32) -> Option<String> {
        self.lines
            .get(&(file.to_path_buf(), line))
            .filter(|text| !text.is_empty())
            .cloned()
    }
}

#[async_trait::async_trait]
impl SnippetReader for StaticSnippetReader {
    async fn read_line(&self, file: &Path, line: u32) -> Option<String> {
        self.lookup(file, line)
    }

    fn read_line_blocking(&self, file: &Path, line: u32) -> Option<String> {
        self.lookup(file, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_source(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn line_at_bounds() {
        let content = "first\n    second  \n\nfourth";
        assert_eq!(line_at(content, 1).as_deref(), Some("first"));
        assert_eq!(line_at(content, 2).as_deref(), Some("second"));
        assert_eq!(line_at(content, 3), None);
        assert_eq!(line_at(content, 4).as_deref(), Some("fourth"));
        assert_eq!(line_at(content, 5), None);
        assert_eq!(line_at(content, 0), None);
    }

    #[tokio::test]
    async fn reads_trimmed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, "app.js", "const a = 1;\n    foo();\n");
        let reader = FsSnippetReader::default();
        assert_eq!(reader.read_line(&path, 2).await.as_deref(), Some("foo();"));
        assert_eq!(reader.read_line_blocking(&path, 1).as_deref(), Some("const a = 1;"));
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let reader = FsSnippetReader::default();
        let path = Path::new("/definitely/not/here/app.js");
        assert_eq!(reader.read_line(path, 1).await, None);
        assert_eq!(reader.read_line_blocking(path, 1), None);
    }

    #[tokio::test]
    async fn directory_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let reader = FsSnippetReader::default();
        assert_eq!(reader.read_line(dir.path(), 1).await, None);
        assert_eq!(reader.read_line_blocking(dir.path(), 1), None);
    }

    #[tokio::test]
    async fn oversized_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, "big.js", "let x = 1;\nlet y = 2;\n");
        let reader = FsSnippetReader::new(Duration::from_secs(1), 4);
        assert_eq!(reader.read_line(&path, 1).await, None);
        assert_eq!(reader.read_line_blocking(&path, 1), None);
    }

    #[tokio::test]
    async fn invalid_utf8_elsewhere_keeps_snippet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.js");
        std::fs::write(&path, b"const a = 1;\n// caf\xe9 \xff\n    foo();\n").unwrap();

        let reader = FsSnippetReader::default();
        assert_eq!(reader.read_line(&path, 3).await.as_deref(), Some("foo();"));
        assert_eq!(reader.read_line_blocking(&path, 3).as_deref(), Some("foo();"));
        assert_eq!(
            reader.read_line_blocking(&path, 2).as_deref(),
            Some("// caf\u{FFFD} \u{FFFD}")
        );
    }

    /// Opening a FIFO for reading blocks until a writer appears.
    #[cfg(unix)]
    fn make_fifo(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());
        path
    }

    /// Release the reader still blocked on `fifo`; it then sees EOF.
    #[cfg(unix)]
    fn release(fifo: &Path) {
        drop(std::fs::OpenOptions::new().write(true).open(fifo).unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stalled_read_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let reader = FsSnippetReader::new(Duration::from_millis(100), 1024);

        let fifo = make_fifo(&dir, "async.pipe");
        let started = std::time::Instant::now();
        assert_eq!(reader.read_line(&fifo, 1).await, None);
        assert!(started.elapsed() < Duration::from_secs(5));
        release(&fifo);

        let fifo = make_fifo(&dir, "blocking.pipe");
        let started = std::time::Instant::now();
        assert_eq!(reader.read_line_blocking(&fifo, 1), None);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(started.elapsed() < Duration::from_secs(5));
        release(&fifo);
    }

    #[tokio::test]
    async fn static_reader_lookup() {
        let reader = StaticSnippetReader::new().with_line("app.js", 3, "  foo();  ");
        assert_eq!(
            reader.read_line(Path::new("app.js"), 3).await.as_deref(),
            Some("foo();")
        );
        assert_eq!(reader.read_line(Path::new("app.js"), 4).await, None);
    }
}
