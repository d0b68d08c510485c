use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::NotifySection;
use crate::error::NotifyError;
use crate::types::LogRecord;

use super::{Channel, channel_payload};

/// Outcome of one notification round. Failures are collected, never raised.
#[derive(Debug, Default)]
pub struct NotifyReport {
    pub delivered: Vec<Channel>,
    pub failed: Vec<(Channel, NotifyError)>,
}

impl NotifyReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Posts explained errors to the configured webhook of each channel.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    channels: BTreeMap<Channel, String>,
}

impl WebhookNotifier {
    pub fn new(channels: BTreeMap<Channel, String>, timeout: Duration) -> crate::error::Result<Self> {
        // reqwest is built without a bundled crypto provider; install ours once.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        Ok(Self { client, channels })
    }

    pub fn from_config(section: &NotifySection) -> crate::error::Result<Self> {
        Self::new(
            section.channels.clone(),
            Duration::from_millis(section.timeout_ms),
        )
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.channels.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Deliver the record to every configured channel, in channel order.
    #[instrument(skip_all, name = "notify")]
    pub async fn notify(&self, record: &LogRecord, trace: Option<&str>) -> NotifyReport {
        let mut report = NotifyReport::default();

        for (&channel, url) in &self.channels {
            let payload = channel_payload(channel, record, trace);
            match self.post(url, &payload).await {
                Ok(()) => {
                    debug!(%channel, "Notification delivered");
                    report.delivered.push(channel);
                }
                Err(e) => {
                    warn!(%channel, error = %e, "[BugBlaster] Failed to notify channel");
                    report.failed.push((channel, e));
                }
            }
        }

        report
    }

    async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }
        Ok(())
    }
}
