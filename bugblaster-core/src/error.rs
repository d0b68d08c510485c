/// Top-level BugBlaster error type.
///
/// The explanation engine itself never fails; these errors come from the
/// collaborators around it (stores, notification channels, configuration,
/// the global panic hook). Each variant wraps a domain-specific error enum,
/// allowing callers to match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum BugBlasterError {
    /// Error from a log store (JSON file or `SQLite`).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error delivering a notification to a channel.
    #[error("Notify error: {0}")]
    Notify(#[from] NotifyError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error installing the process-wide panic handler.
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),
}

/// Errors from the append-only log stores.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization/deserialization of records failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O error reading or writing the log file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The existing log file is not a JSON array of records.
    #[error("Corrupt log file {path}: {message}")]
    Corrupt {
        /// Path of the unreadable log file.
        path: String,
        /// Description of the parse failure.
        message: String,
    },
}

/// Errors from webhook delivery.
#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    /// Network-level failure reaching the webhook.
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook returned a non-success HTTP status.
    #[error("Webhook rejected payload (HTTP {status}): {body}")]
    Rejected {
        /// HTTP status code from the endpoint.
        status: u16,
        /// Response body text.
        body: String,
    },
}

/// Errors in BugBlaster configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors from the process-wide panic handler.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HookError {
    /// A handler is already installed and has not been disposed.
    #[error("global handler already installed")]
    AlreadyInstalled,
}

/// Convenience alias for `Result<T, BugBlasterError>`.
pub type Result<T> = std::result::Result<T, BugBlasterError>;
