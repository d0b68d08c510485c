/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

/// SQL schema for the `SQLite` log store.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS bugblaster_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per explained error, in creation order
CREATE TABLE IF NOT EXISTS error_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    message TEXT NOT NULL,
    location TEXT NOT NULL,
    tip TEXT NOT NULL,
    reason TEXT NOT NULL,
    path TEXT,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_error_log_timestamp ON error_log(timestamp);
CREATE INDEX IF NOT EXISTS idx_error_log_path ON error_log(path);
";
