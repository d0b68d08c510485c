//! Process-wide handler for panics that escape request handling.
//!
//! Installed explicitly with [`install_global_handler`]; at most one handler
//! is active at a time. The returned [`GlobalHandlerGuard`] restores the
//! previous panic hook when disposed or dropped.

use std::backtrace::Backtrace;
use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{error, info};

use crate::analyze::ExplanationEngine;
use crate::error::HookError;
use crate::extract::{frames_from_panic, parse_stack_trace};
use crate::render::render_panic_report;
use crate::types::{Explanation, RaisedError};

static INSTALLED: AtomicBool = AtomicBool::new(false);

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Receives each explained panic.
pub type PanicReporter = Arc<dyn Fn(&PanicReport) + Send + Sync>;

/// An explained panic.
#[derive(Debug, Clone, Serialize)]
pub struct PanicReport {
    pub error: RaisedError,
    pub explanation: Explanation,
}

/// Disposer for the installed handler.
#[must_use = "dropping the guard uninstalls the handler"]
pub struct GlobalHandlerGuard {
    previous: Option<Arc<PanicHook>>,
}

impl std::fmt::Debug for GlobalHandlerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalHandlerGuard")
            .field("active", &self.previous.is_some())
            .finish()
    }
}

impl GlobalHandlerGuard {
    /// Uninstall the handler and restore the hook that was active before.
    pub fn dispose(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        // `set_hook` panics on a panicking thread.
        if std::thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.take() {
            drop(std::panic::take_hook());
            std::panic::set_hook(Box::new(move |info| (*previous)(info)));
            INSTALLED.store(false, Ordering::Release);
            info!("[BugBlaster] Global panic handler removed");
        }
    }
}

impl Drop for GlobalHandlerGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Install the handler that explains panics and logs them with `tracing`.
pub fn install_global_handler(
    engine: Arc<ExplanationEngine>,
) -> Result<GlobalHandlerGuard, HookError> {
    install_with_reporter(engine, Arc::new(log_panic_report))
}

/// Install the handler with a custom destination for explained panics.
///
/// The previously installed hook still runs after the reporter.
pub fn install_with_reporter(
    engine: Arc<ExplanationEngine>,
    reporter: PanicReporter,
) -> Result<GlobalHandlerGuard, HookError> {
    if INSTALLED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Err(HookError::AlreadyInstalled);
    }

    let previous: Arc<PanicHook> = Arc::new(std::panic::take_hook());
    let chained = Arc::clone(&previous);
    std::panic::set_hook(Box::new(move |info| {
        let report = explain_panic(&engine, info);
        reporter(&report);
        (*chained)(info);
    }));

    info!("[BugBlaster] Global panic handler installed");
    Ok(GlobalHandlerGuard {
        previous: Some(previous),
    })
}

fn explain_panic(engine: &ExplanationEngine, info: &PanicHookInfo<'_>) -> PanicReport {
    let error = RaisedError::new(panic_message(info));
    let backtrace = Backtrace::force_capture().to_string();
    let frames = match info.location() {
        Some(loc) => frames_from_panic(loc.file(), loc.line(), loc.column(), &backtrace),
        None => parse_stack_trace(&backtrace),
    };
    let explanation = engine.explain_blocking(&error, &frames, None);
    PanicReport { error, explanation }
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

fn log_panic_report(report: &PanicReport) {
    error!(
        message = %report.error,
        location = %report.explanation.location,
        reason = %report.explanation.reason,
        tip = %report.explanation.tip,
        "{}",
        render_panic_report(&report.error, &report.explanation)
    );
}
