// JSON log file: a pretty-printed array of records, rewritten on each append.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::types::LogRecord;

use super::LogStore;

/// Log store backed by a single JSON array file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// The file is created on first append; a missing file reads as empty.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<LogRecord>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl LogStore for JsonFileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    #[instrument(skip_all, name = "json_append")]
    async fn append(&self, record: &LogRecord) -> crate::error::Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        records.push(record.clone());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StoreError::Io)?;
        }
        let json = serde_json::to_string_pretty(&records).map_err(StoreError::Serialization)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(StoreError::Io)?;

        debug!(path = %self.path.display(), total = records.len(), "[BugBlaster] Logged error");
        Ok(())
    }

    async fn records(&self) -> crate::error::Result<Vec<LogRecord>> {
        let _guard = self.write_lock.lock().await;
        Ok(self.load().await?)
    }
}
