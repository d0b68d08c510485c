pub mod json_file;
pub mod schema;
pub mod sqlite;
pub mod traits;

use std::sync::Arc;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;
pub use traits::LogStore;

use crate::config::{LogBackend, LogSection};

/// Open the store described by the `[log]` section, or `None` when logging
/// is disabled.
pub fn open_configured(section: &LogSection) -> crate::error::Result<Option<Arc<dyn LogStore>>> {
    if !section.enabled {
        return Ok(None);
    }
    let store: Arc<dyn LogStore> = match section.backend {
        LogBackend::Json => Arc::new(JsonFileStore::new(&section.path)),
        LogBackend::Sqlite => Arc::new(SqliteStore::open(&section.path)?),
    };
    Ok(Some(store))
}
