use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, params};
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::types::LogRecord;

use super::LogStore;
use super::schema;

/// SQLite-backed implementation of `LogStore`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
        }
        let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("bugblaster store mutex poisoned");

        conn.execute_batch("PRAGMA synchronous = NORMAL;")
            .map_err(StoreError::Sqlite)?;

        // WAL is ignored for in-memory databases
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(StoreError::Sqlite)?;

        conn.execute(
            "INSERT OR IGNORE INTO bugblaster_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(StoreError::Sqlite)?;

        Ok(())
    }

    /// Number of stored records.
    pub fn count(&self) -> crate::error::Result<u64> {
        let conn = self.conn.lock().expect("bugblaster store mutex poisoned");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM error_log", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl LogStore for SqliteStore {
    fn location(&self) -> String {
        self.db_path
            .as_ref()
            .map_or_else(|| ":memory:".to_string(), |p| format!("sqlite:{}", p.display()))
    }

    #[instrument(skip_all, name = "sqlite_append")]
    async fn append(&self, record: &LogRecord) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("bugblaster store mutex poisoned");
        conn.execute(
            "INSERT INTO error_log (message, location, tip, reason, path, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.message,
                record.location,
                record.tip,
                record.reason,
                record.path,
                record.timestamp,
            ],
        )
        .map_err(StoreError::Sqlite)?;
        debug!(id = conn.last_insert_rowid(), "[BugBlaster] Logged error");
        Ok(())
    }

    async fn records(&self) -> crate::error::Result<Vec<LogRecord>> {
        let conn = self.conn.lock().expect("bugblaster store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT message, location, tip, reason, path, timestamp
                 FROM error_log ORDER BY id",
            )
            .map_err(StoreError::Sqlite)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LogRecord {
                    message: row.get(0)?,
                    location: row.get(1)?,
                    tip: row.get(2)?,
                    reason: row.get(3)?,
                    path: row.get(4)?,
                    timestamp: row.get(5)?,
                })
            })
            .map_err(StoreError::Sqlite)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(StoreError::Sqlite)?);
        }
        Ok(records)
    }
}
