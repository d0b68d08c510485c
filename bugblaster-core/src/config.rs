use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::notify::Channel;

/// Default file name looked up by the CLI.
pub const CONFIG_FILE_NAME: &str = "bugblaster.toml";

/// Storage backend for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogBackend {
    /// Pretty-printed JSON array, rewritten on every append.
    #[default]
    Json,
    /// `SQLite` database with one row per record.
    Sqlite,
}

/// Top-level BugBlaster configuration, matching `bugblaster.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BugBlasterConfig {
    #[serde(default)]
    pub response: ResponseSection,
    #[serde(default)]
    pub log: LogSection,
    #[serde(default)]
    pub snippet: SnippetSection,
    #[serde(default)]
    pub notify: NotifySection,
}

/// Client-facing response for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSection {
    /// Body text sent to the client instead of the error.
    pub default_message: String,
    /// Include the raw error message under `details` (development only).
    pub expose_details: bool,
}

impl Default for ResponseSection {
    fn default() -> Self {
        Self {
            default_message: "Something went wrong. We're looking into it!".to_string(),
            expose_details: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub enabled: bool,
    pub backend: LogBackend,
    pub path: PathBuf,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: LogBackend::Json,
            path: PathBuf::from("bugblaster-logs.json"),
        }
    }
}

/// Bounds on source-line retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetSection {
    pub read_timeout_ms: u64,
    pub max_file_bytes: u64,
}

impl Default for SnippetSection {
    fn default() -> Self {
        Self {
            read_timeout_ms: 500,
            max_file_bytes: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    pub timeout_ms: u64,
    /// Webhook URL per channel; channels without an entry are skipped.
    pub channels: BTreeMap<Channel, String>,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            channels: BTreeMap::new(),
        }
    }
}

impl BugBlasterConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.display().to_string())
            } else {
                ConfigError::Parse(format!("{}: {e}", path.display()))
            }
        })?;
        Self::from_toml_str(&content)
    }

    /// Check cross-field constraints. Called once when a guard is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.response.default_message.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "response.default_message must not be empty".into(),
            ));
        }
        if self.log.enabled && self.log.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "log.path must be set when logging is enabled".into(),
            ));
        }
        if self.snippet.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "snippet.read_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.snippet.max_file_bytes == 0 {
            return Err(ConfigError::Invalid(
                "snippet.max_file_bytes must be greater than zero".into(),
            ));
        }
        if self.notify.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "notify.timeout_ms must be greater than zero".into(),
            ));
        }
        for (channel, url) in &self.notify.channels {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "notify.channels.{channel}: expected an http(s) URL, got {url:?}"
                )));
            }
        }
        Ok(())
    }
}
