// Plain-text console report for an explained error.

use crate::types::{Explanation, RaisedError};

/// Four-line report: what failed, where, why, and what to do.
pub fn render_report(error: &RaisedError, explanation: &Explanation) -> String {
    format!(
        "[BugBlaster] Error Detected: {}\nWhere: {}\nWhy: {}\nTip: {}",
        error.text(),
        explanation.location,
        explanation.reason,
        explanation.tip
    )
}

/// Report for a panic that escaped request handling.
pub fn render_panic_report(error: &RaisedError, explanation: &Explanation) -> String {
    format!(
        "[BugBlaster] Uncaught panic: {}\nWhere: {}\nWhy: {}\nTip: {}",
        error.text(),
        explanation.location,
        explanation.reason,
        explanation.tip
    )
}
