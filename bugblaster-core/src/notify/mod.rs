// Notification channels: per-channel webhook payloads for explained errors.

pub mod webhook;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::types::LogRecord;

pub use webhook::{NotifyReport, WebhookNotifier};

/// A named external notification destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Slack,
    Teams,
    Discord,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Teams => "teams",
            Self::Discord => "discord",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body posted to a channel's webhook.
pub fn channel_payload(channel: Channel, record: &LogRecord, trace: Option<&str>) -> Value {
    let path = record.path.as_deref().unwrap_or("-");
    match channel {
        Channel::Slack => json!({
            "text": format!(
                "🐞 *Error Detected*: {}\n*Where*: {}\n*When*: {}\n*Path*: {}",
                record.message, record.location, record.timestamp, path
            ),
        }),
        Channel::Discord => json!({
            "content": format!(
                "🐞 **Error Detected**: {}\n**Where**: {}\n**When**: {}\n**Path**: {}",
                record.message, record.location, record.timestamp, path
            ),
        }),
        Channel::Teams => json!({
            "@type": "MessageCard",
            "@context": "http://schema.org/extensions",
            "summary": "BugBlaster detected error in app",
            "title": "🐞 Error Detected",
            "sections": [{
                "facts": [
                    { "name": "Message", "value": record.message },
                    { "name": "Reason", "value": record.reason },
                    { "name": "Location", "value": record.location },
                    { "name": "Trace", "value": trace.unwrap_or("-") },
                    { "name": "Path", "value": path },
                    { "name": "Timestamp", "value": record.timestamp },
                ],
            }],
        }),
    }
}
