// Record assembly: merges an explanation with error metadata into the
// persisted `LogRecord` shape.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::{Explanation, LogRecord, RaisedError};

/// Source of record timestamps.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Build the persistable record for an explained error.
pub fn assemble(
    error: &RaisedError,
    explanation: &Explanation,
    request_path: Option<&str>,
    clock: &dyn Clock,
) -> LogRecord {
    LogRecord {
        message: error.text().to_string(),
        location: explanation.location.clone(),
        tip: explanation.tip.clone(),
        reason: explanation.reason.clone(),
        path: request_path.map(str::to_string),
        timestamp: format_timestamp(clock.now()),
    }
}

/// `2024-05-01T12:30:00.123Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
