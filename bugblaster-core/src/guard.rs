//! Request-failure adapter: explain, log, persist, notify, and respond.
//!
//! [`ErrorGuard`] is framework-agnostic. A web framework's error hook hands
//! it the raised error, its trace text and the request summary; the guard
//! returns the response to send. Every collaborator failure is degraded to
//! a warning so the client always receives an answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::analyze::ExplanationEngine;
use crate::config::{BugBlasterConfig, ResponseSection};
use crate::extract::{FrameExtractor, FsSnippetReader, TextTraceExtractor};
use crate::notify::{NotifyReport, WebhookNotifier};
use crate::record::{Clock, SystemClock, assemble};
use crate::render::render_report;
use crate::store::{self, LogStore};
use crate::types::{Explanation, LogRecord, RaisedError, RequestContext};

/// Builds the client response in place of the default one.
pub type Responder =
    Arc<dyn Fn(&RaisedError, Option<&RequestContext>) -> ErrorResponse + Send + Sync>;

/// JSON body sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Status and body for a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub body: ErrorBody,
}

/// Everything the guard produced for one error.
#[derive(Debug)]
pub struct HandleOutcome {
    pub explanation: Explanation,
    pub record: LogRecord,
    pub response: ErrorResponse,
    /// Whether the record reached the configured store.
    pub stored: bool,
    /// `None` when no channel is configured.
    pub notify: Option<NotifyReport>,
}

/// Wires the engine to the log store, notification channels and client
/// response for failed requests.
pub struct ErrorGuard {
    response: ResponseSection,
    engine: Arc<ExplanationEngine>,
    extractor: Arc<dyn FrameExtractor>,
    store: Option<Arc<dyn LogStore>>,
    notifier: Option<WebhookNotifier>,
    clock: Arc<dyn Clock>,
    responder: Option<Responder>,
}

impl std::fmt::Debug for ErrorGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorGuard")
            .field("response", &self.response)
            .field("extractor", &self.extractor.name())
            .field("store", &self.store.as_ref().map(|s| s.location()))
            .field("notifier", &self.notifier)
            .field("custom_responder", &self.responder.is_some())
            .finish_non_exhaustive()
    }
}

impl ErrorGuard {
    pub fn builder() -> ErrorGuardBuilder {
        ErrorGuardBuilder::default()
    }

    /// Validate the config and open its store and notifier.
    pub fn from_config(config: &BugBlasterConfig) -> crate::error::Result<Self> {
        config.validate()?;

        let reader = FsSnippetReader::from_config(&config.snippet);
        let engine = ExplanationEngine::new(Arc::new(reader));
        let store = store::open_configured(&config.log)?;
        let notifier = if config.notify.channels.is_empty() {
            None
        } else {
            Some(WebhookNotifier::from_config(&config.notify)?)
        };

        info!(
            store = store.as_ref().map(|s| s.location()).as_deref().unwrap_or("disabled"),
            channels = config.notify.channels.len(),
            "[BugBlaster] Error guard ready"
        );

        let mut builder = Self::builder()
            .response(config.response.clone())
            .engine(Arc::new(engine));
        if let Some(store) = store {
            builder = builder.store(store);
        }
        if let Some(notifier) = notifier {
            builder = builder.notifier(notifier);
        }
        Ok(builder.build())
    }

    /// Shared engine, e.g. for [`install_global_handler`](crate::hook::install_global_handler).
    pub fn engine(&self) -> Arc<ExplanationEngine> {
        Arc::clone(&self.engine)
    }

    pub fn store(&self) -> Option<&Arc<dyn LogStore>> {
        self.store.as_ref()
    }

    /// Explain and report one failed request. Never fails.
    #[instrument(skip_all, name = "handle_error")]
    pub async fn handle(
        &self,
        raised: &RaisedError,
        trace: Option<&str>,
        request: Option<&RequestContext>,
    ) -> HandleOutcome {
        let frames = trace.map(|t| self.extractor.extract(t)).unwrap_or_default();
        let explanation = self.engine.explain(raised, &frames, request).await;

        error!(
            message = %raised,
            location = %explanation.location,
            reason = %explanation.reason,
            tip = %explanation.tip,
            "{}",
            render_report(raised, &explanation)
        );

        let path = request.map(|r| r.path.as_str());
        let record = assemble(raised, &explanation, path, self.clock.as_ref());

        let stored = match &self.store {
            Some(store) => match store.append(&record).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(store = %store.location(), error = %e, "[BugBlaster] Failed to log error");
                    false
                }
            },
            None => false,
        };

        let notify = match &self.notifier {
            Some(notifier) if !notifier.is_empty() => {
                Some(notifier.notify(&record, explanation.trace.as_deref()).await)
            }
            _ => None,
        };

        let response = self.respond(raised, request);

        HandleOutcome {
            explanation,
            record,
            response,
            stored,
            notify,
        }
    }

    /// Handle a failed future that produced no trace.
    pub async fn handle_rejection(
        &self,
        reason: impl std::fmt::Display,
        request: Option<&RequestContext>,
    ) -> HandleOutcome {
        self.handle(&RaisedError::rejection(reason), None, request)
            .await
    }

    /// Handle any `std::error::Error`.
    pub async fn handle_error(
        &self,
        err: &(dyn std::error::Error + 'static),
        trace: Option<&str>,
        request: Option<&RequestContext>,
    ) -> HandleOutcome {
        self.handle(&RaisedError::from_error(err), trace, request)
            .await
    }

    fn respond(&self, raised: &RaisedError, request: Option<&RequestContext>) -> ErrorResponse {
        if let Some(responder) = &self.responder {
            return responder(raised, request);
        }
        ErrorResponse {
            status: 500,
            body: ErrorBody {
                error: self.response.default_message.clone(),
                details: self
                    .response
                    .expose_details
                    .then(|| raised.text().to_string()),
            },
        }
    }
}

/// Explicit wiring for [`ErrorGuard`]. Unset collaborators fall back to the
/// standard engine, the text trace extractor, the system clock, no store,
/// and no notifications.
#[derive(Default)]
pub struct ErrorGuardBuilder {
    response: ResponseSection,
    engine: Option<Arc<ExplanationEngine>>,
    extractor: Option<Arc<dyn FrameExtractor>>,
    store: Option<Arc<dyn LogStore>>,
    notifier: Option<WebhookNotifier>,
    clock: Option<Arc<dyn Clock>>,
    responder: Option<Responder>,
}

impl std::fmt::Debug for ErrorGuardBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorGuardBuilder")
            .field("response", &self.response)
            .field("store", &self.store)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl ErrorGuardBuilder {
    #[must_use]
    pub fn response(mut self, response: ResponseSection) -> Self {
        self.response = response;
        self
    }

    #[must_use]
    pub fn engine(mut self, engine: Arc<ExplanationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    #[must_use]
    pub fn extractor(mut self, extractor: Arc<dyn FrameExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn LogStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: WebhookNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn responder(mut self, responder: Responder) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn build(self) -> ErrorGuard {
        ErrorGuard {
            response: self.response,
            engine: self.engine.unwrap_or_default(),
            extractor: self
                .extractor
                .unwrap_or_else(|| Arc::new(TextTraceExtractor)),
            store: self.store,
            notifier: self.notifier,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            responder: self.responder,
        }
    }
}
