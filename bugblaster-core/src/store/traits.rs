use crate::types::LogRecord;

/// Append-only destination for log records.
///
/// Implementations serialise their own concurrent writers. Records are
/// never updated or removed once appended.
#[async_trait::async_trait]
pub trait LogStore: Send + Sync + std::fmt::Debug {
    /// Human-readable description of where records go (path, database).
    fn location(&self) -> String;

    /// Append one record after all previously appended records.
    async fn append(&self, record: &LogRecord) -> crate::error::Result<()>;

    /// All records in creation order.
    async fn records(&self) -> crate::error::Result<Vec<LogRecord>>;
}
