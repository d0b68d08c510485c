// Explanation engine: location composition, snippet lookup, rule evaluation,
// and request-context decoration. Never fails; faults degrade to the baseline.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::extract::{FsSnippetReader, SnippetReader};
use crate::types::{Explanation, RaisedError, RequestContext, StackFrame, UNKNOWN_LOCATION};

use super::rules::{Evidence, RuleSet};

const BASELINE_REASON: &str = "An unexpected issue occurred.";

const MISSING_BODY_CLAUSE: &str = " The request has no parsed body; check that body-parsing middleware runs before this handler.";

/// Derives a structured [`Explanation`] from an error, its frames, and the
/// request that was being served.
#[derive(Debug, Clone)]
pub struct ExplanationEngine {
    rules: RuleSet,
    reader: Arc<dyn SnippetReader>,
}

impl Default for ExplanationEngine {
    fn default() -> Self {
        Self::new(Arc::new(FsSnippetReader::default()))
    }
}

impl ExplanationEngine {
    /// Engine with the standard rule table.
    pub fn new(reader: Arc<dyn SnippetReader>) -> Self {
        Self {
            rules: RuleSet::standard(),
            reader,
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Explain an error, reading the source line of the innermost frame.
    #[instrument(skip_all, name = "explain")]
    pub async fn explain(
        &self,
        error: &RaisedError,
        frames: &[StackFrame],
        context: Option<&RequestContext>,
    ) -> Explanation {
        let snippet = match snippet_target(frames) {
            Some((file, line)) => self.reader.read_line(Path::new(file), line).await,
            None => None,
        };
        self.explain_with_snippet(error, frames, snippet.as_deref(), context)
    }

    /// Same as [`explain`](Self::explain) with a blocking snippet read.
    pub fn explain_blocking(
        &self,
        error: &RaisedError,
        frames: &[StackFrame],
        context: Option<&RequestContext>,
    ) -> Explanation {
        let snippet = snippet_target(frames)
            .and_then(|(file, line)| self.reader.read_line_blocking(Path::new(file), line));
        self.explain_with_snippet(error, frames, snippet.as_deref(), context)
    }

    /// Pure rule evaluation over an already retrieved snippet.
    pub fn explain_with_snippet(
        &self,
        error: &RaisedError,
        frames: &[StackFrame],
        snippet: Option<&str>,
        context: Option<&RequestContext>,
    ) -> Explanation {
        let message = error.text();

        let mut location = frames.first().map_or_else(|| UNKNOWN_LOCATION.to_string(), base_location);
        if let Some(code) = snippet {
            location.push_str(&format!(" - Code: \"{code}\""));
        }

        let mut reason = BASELINE_REASON.to_string();
        let mut tip = format!("Review the code at {location} and check for potential issues.");
        if let Some(code) = snippet {
            tip.push_str(&format!(" The code \"{code}\" may provide a clue."));
        }

        let evidence = Evidence {
            message,
            snippet,
            location: &location,
        };
        // A panic raised by a pushed rule during unwinding aborts the process.
        let matched = if std::thread::panicking() {
            self.rules.first_builtin_match(&evidence)
        } else {
            self.rules.first_match(&evidence)
        };
        if let Some(rule) = matched {
            debug!(rule = rule.name, "Explanation rule matched");
            match catch_unwind(AssertUnwindSafe(|| (rule.handler)(&evidence))) {
                Ok(verdict) => {
                    if let Some(r) = verdict.reason.filter(|r| !r.trim().is_empty()) {
                        reason = r;
                    }
                    if let Some(t) = verdict.tip.filter(|t| !t.trim().is_empty()) {
                        tip = t;
                    }
                }
                Err(_) => {
                    warn!(rule = rule.name, "Explanation rule panicked; using baseline");
                }
            }
        }

        if let Some(ctx) = context {
            if let Some(tag) = ctx.tag() {
                location.push(' ');
                location.push_str(&tag);
            }
            if message.to_lowercase().contains("undefined") && !ctx.has_body {
                tip.push_str(MISSING_BODY_CLAUSE);
            }
        }

        Explanation {
            reason,
            tip,
            location,
            trace: full_trace(frames),
        }
    }
}

/// `file:line (in function)` for the innermost frame.
fn base_location(frame: &StackFrame) -> String {
    let Some(file) = frame.file.as_deref() else {
        return UNKNOWN_LOCATION.to_string();
    };
    let function = frame.function.as_deref().unwrap_or("anonymous function");
    match frame.line {
        Some(line) => format!("{file}:{line} (in {function})"),
        None => format!("{file} (in {function})"),
    }
}

fn snippet_target(frames: &[StackFrame]) -> Option<(&str, u32)> {
    let top = frames.first()?;
    Some((top.file.as_deref()?, top.line?))
}

fn full_trace(frames: &[StackFrame]) -> Option<String> {
    if frames.len() < 2 {
        return None;
    }
    let chain: Vec<String> = frames.iter().map(ToString::to_string).collect();
    Some(format!("Full stack: {}", chain.join(" -> ")))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::extract::StaticSnippetReader;
    use proptest::prelude::*;

    fn engine() -> ExplanationEngine {
        ExplanationEngine::new(Arc::new(StaticSnippetReader::new()))
    }

    fn arb_frames() -> impl Strategy<Value = Vec<StackFrame>> {
        prop::collection::vec(
            (
                prop::option::of("[a-z/]{1,12}\\.js"),
                prop::option::of(1u32..5000),
                prop::option::of("[a-zA-Z_]{1,10}"),
            )
                .prop_map(|(file, line, function)| StackFrame {
                    file,
                    line,
                    column: None,
                    function,
                }),
            0..4,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn explanation_fields_never_empty(
            message in "(?s).{0,120}",
            snippet in prop::option::of("[ -~]{1,60}"),
            frames in arb_frames(),
            with_ctx in any::<bool>(),
            has_body in any::<bool>(),
        ) {
            let ctx = RequestContext::new("GET", "/x", has_body);
            let out = engine().explain_with_snippet(
                &RaisedError::new(message),
                &frames,
                snippet.as_deref(),
                with_ctx.then_some(&ctx),
            );
            prop_assert!(!out.reason.trim().is_empty());
            prop_assert!(!out.tip.trim().is_empty());
            prop_assert!(!out.location.is_empty());
        }

        #[test]
        fn empty_frames_give_unknown_location(message in "[ -~]{0,80}") {
            let out = engine().explain_with_snippet(&RaisedError::new(message), &[], None, None);
            prop_assert_eq!(out.location, UNKNOWN_LOCATION);
        }

        #[test]
        fn not_a_function_names_identifier(name in "fn_[A-Z0-9_]{0,10}") {
            let message = format!("{name} is not a function");
            let out = engine().explain_with_snippet(
                &RaisedError::new(message),
                &[],
                Some("await run();"),
                None,
            );
            let quoted = format!("'{name}'");
            prop_assert!(out.reason.contains(&quoted));
            prop_assert!(!out.reason.contains("asynchronous"));
        }

        #[test]
        fn explain_is_idempotent(message in "[ -~]{0,80}", frames in arb_frames()) {
            let err = RaisedError::new(message);
            let first = engine().explain_with_snippet(&err, &frames, None, None);
            let second = engine().explain_with_snippet(&err, &frames, None, None);
            prop_assert_eq!(first, second);
        }
    }
}
