// Stack trace extraction: V8/Node `at ...` frames and Rust `std::backtrace` frames.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::types::StackFrame;

use super::traits::FrameExtractor;

static V8_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+(?:async\s+)?(?:(?P<func>.+?)\s+\((?P<loc>[^()]*)\)|(?P<bare>\S+))\s*$")
        .expect("V8_FRAME regex pattern is valid")
});

static RUST_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<index>\d+):\s+(?P<func>\S.*?)\s*$")
        .expect("RUST_FRAME regex pattern is valid")
});

static RUST_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+(?P<loc>\S.*?)\s*$").expect("RUST_AT regex pattern is valid")
});

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.+?):(?P<line>\d+)(?::(?P<col>\d+))?$")
        .expect("LOCATION regex pattern is valid")
});

static RUST_HASH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"::h[0-9a-f]{16}$").expect("RUST_HASH_SUFFIX regex pattern is valid")
});

/// Function-name prefixes of runtime frames that sit above a panic site.
const RUNTIME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "rust_begin_unwind",
    "__rust",
];

/// Extractor for textual traces as produced by Node.js or `std::backtrace`.
///
/// The format is detected per trace: a trace whose first frame-like line
/// is `0: function` is read with the Rust backtrace grammar, otherwise V8
/// `at` lines are read.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextTraceExtractor;

impl FrameExtractor for TextTraceExtractor {
    fn name(&self) -> &'static str {
        "text-trace"
    }

    fn extract(&self, trace: &str) -> Vec<StackFrame> {
        let frames = parse_stack_trace(trace);
        debug!(frames = frames.len(), "Extracted stack frames");
        frames
    }
}

/// Parse a stack trace into frames, most recent call first.
pub fn parse_stack_trace(trace: &str) -> Vec<StackFrame> {
    if is_rust_backtrace(trace) {
        parse_rust_backtrace(trace)
    } else {
        parse_v8_trace(trace)
    }
}

/// Backtraces number their frames from zero. A numbered line that comes
/// first with any other index, or after a V8 frame, is message text.
fn is_rust_backtrace(trace: &str) -> bool {
    for line in trace.lines() {
        if let Some(caps) = RUST_FRAME.captures(line) {
            return &caps["index"] == "0";
        }
        if V8_FRAME.is_match(line) {
            return false;
        }
    }
    false
}

fn parse_v8_trace(trace: &str) -> Vec<StackFrame> {
    trace
        .lines()
        .filter_map(|line| {
            let caps = V8_FRAME.captures(line)?;
            let (function, loc) = match (caps.name("func"), caps.name("loc"), caps.name("bare")) {
                (Some(func), Some(loc), _) => (Some(func.as_str()), loc.as_str()),
                (_, _, Some(bare)) => (None, bare.as_str()),
                _ => return None,
            };
            let mut frame = parse_location(loc);
            frame.function = function.map(|f| f.strip_prefix("new ").unwrap_or(f).to_string());
            Some(frame)
        })
        .collect()
}

fn parse_rust_backtrace(trace: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();
    let mut pending_location = false;

    for line in trace.lines() {
        if let Some(caps) = RUST_FRAME.captures(line) {
            let func = RUST_HASH_SUFFIX.replace(&caps["func"], "");
            frames.push(StackFrame {
                function: Some(func.into_owned()),
                ..Default::default()
            });
            pending_location = true;
        } else if pending_location {
            let Some(caps) = RUST_AT.captures(line) else {
                continue;
            };
            if let Some(frame) = frames.last_mut() {
                let parsed = parse_location(&caps["loc"]);
                frame.file = parsed.file;
                frame.line = parsed.line;
                frame.column = parsed.column;
            }
            pending_location = false;
        }
    }

    frames
}

/// Split `file:line[:col]` into a frame; anything else (`native`,
/// `<anonymous>`) yields a frame without a file.
fn parse_location(loc: &str) -> StackFrame {
    let loc = loc.strip_prefix("file://").unwrap_or(loc);
    let Some(caps) = LOCATION.captures(loc) else {
        return StackFrame::default();
    };
    StackFrame {
        file: Some(caps["file"].to_string()),
        line: caps["line"].parse().ok(),
        column: caps.name("col").and_then(|c| c.as_str().parse().ok()),
        function: None,
    }
}

/// Build the frame sequence for a panic.
///
/// The panic location becomes frame 0. Its function name is taken from the
/// first backtrace frame at the same file and line; frames above that one
/// (the unwinding machinery) are dropped.
pub fn frames_from_panic(
    file: &str,
    line: u32,
    column: u32,
    backtrace_text: &str,
) -> Vec<StackFrame> {
    let parsed = parse_rust_backtrace(backtrace_text);

    let site = parsed.iter().position(|f| {
        f.line == Some(line) && f.file.as_deref().is_some_and(|p| same_source(p, file))
    });

    let mut top = StackFrame {
        file: Some(file.to_string()),
        line: Some(line),
        column: Some(column),
        function: None,
    };

    let rest: Vec<StackFrame> = match site {
        Some(idx) => {
            top.function.clone_from(&parsed[idx].function);
            parsed.into_iter().skip(idx + 1).collect()
        }
        None => parsed
            .into_iter()
            .filter(|f| {
                !f.function
                    .as_deref()
                    .is_some_and(|name| RUNTIME_PREFIXES.iter().any(|p| name.starts_with(p)))
            })
            .collect(),
    };

    std::iter::once(top).chain(rest).collect()
}

/// Backtraces report absolute or `./`-prefixed paths while panic locations
/// are workspace-relative.
fn same_source(backtrace_path: &str, location_file: &str) -> bool {
    let trimmed = backtrace_path.trim_start_matches("./");
    trimmed == location_file || trimmed.ends_with(&format!("/{location_file}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_TRACE: &str = "TypeError: Cannot read properties of null (reading 'name')
    at getUser (/srv/app/routes/users.js:14:22)
    at async Layer.handle (/srv/app/node_modules/express/lib/router/layer.js:95:5)
    at /srv/app/index.js:7:3
    at new Session (file:///srv/app/session.js:3:9)
    at process.processTicksAndRejections (node:internal/process/task_queues:95:5)
    at Array.forEach (native)";

    const RUST_TRACE: &str = "   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:312:9
   1: bugblaster_core::hook::on_panic::h0123456789abcdef
             at ./bugblaster-core/src/hook.rs:40:21
   2: std::panicking::rust_panic_with_hook
   3: demo::handler
             at ./src/main.rs:12:5
   4: demo::main
             at ./src/main.rs:4:5";

    #[test]
    fn parses_node_frames_in_order() {
        let frames = parse_stack_trace(NODE_TRACE);
        assert_eq!(frames.len(), 6);

        assert_eq!(frames[0].file.as_deref(), Some("/srv/app/routes/users.js"));
        assert_eq!(frames[0].line, Some(14));
        assert_eq!(frames[0].column, Some(22));
        assert_eq!(frames[0].function.as_deref(), Some("getUser"));

        assert_eq!(frames[1].function.as_deref(), Some("Layer.handle"));

        // Bare location without a function name
        assert_eq!(frames[2].file.as_deref(), Some("/srv/app/index.js"));
        assert_eq!(frames[2].function_name(), "anonymous");

        // `new` prefix and file:// URL are stripped
        assert_eq!(frames[3].function.as_deref(), Some("Session"));
        assert_eq!(frames[3].file.as_deref(), Some("/srv/app/session.js"));

        assert_eq!(frames[4].file.as_deref(), Some("node:internal/process/task_queues"));

        // `native` has no file
        assert_eq!(frames[5].file, None);
        assert_eq!(frames[5].function.as_deref(), Some("Array.forEach"));
    }

    #[test]
    fn parses_rust_backtrace() {
        let frames = parse_stack_trace(RUST_TRACE);
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[1].function.as_deref(), Some("bugblaster_core::hook::on_panic"));
        assert_eq!(frames[1].line, Some(40));
        // Frame without an `at` line keeps no location
        assert_eq!(frames[2].file, None);
        assert_eq!(frames[3].file.as_deref(), Some("./src/main.rs"));
        assert_eq!(frames[3].line, Some(12));
    }

    #[test]
    fn numbered_message_line_is_not_a_backtrace() {
        let trace = "Error: upstream replied
  502: Bad Gateway
    at getUser (/srv/app/users.js:14:22)
    at next (/srv/app/node_modules/express/lib/router/route.js:149:13)";
        let frames = parse_stack_trace(trace);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].file.as_deref(), Some("/srv/app/users.js"));
        assert_eq!(frames[0].line, Some(14));
        assert_eq!(frames[0].function.as_deref(), Some("getUser"));

        // Numbered lines after the first V8 frame do not switch grammar
        let trailing = format!("{NODE_TRACE}\n  0: retry");
        assert_eq!(parse_stack_trace(&trailing).len(), 6);
    }

    #[test]
    fn garbage_yields_no_frames() {
        assert!(parse_stack_trace("").is_empty());
        assert!(parse_stack_trace("Error: boom\nnot a frame\n").is_empty());
        assert!(parse_stack_trace("disabled backtrace").is_empty());
    }

    #[test]
    fn oversized_line_number_is_dropped() {
        let frames = parse_stack_trace("    at f (a.js:99999999999:1)");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].file.as_deref(), Some("a.js"));
        assert_eq!(frames[0].line, None);
    }

    #[test]
    fn panic_frames_anchor_on_location() {
        let frames = frames_from_panic("src/main.rs", 12, 5, RUST_TRACE);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].file.as_deref(), Some("src/main.rs"));
        assert_eq!(frames[0].line, Some(12));
        assert_eq!(frames[0].function.as_deref(), Some("demo::handler"));
        assert_eq!(frames[1].function.as_deref(), Some("demo::main"));
    }

    #[test]
    fn panic_frames_without_match_drop_runtime_frames() {
        let frames = frames_from_panic("src/other.rs", 1, 1, RUST_TRACE);
        assert_eq!(frames[0].file.as_deref(), Some("src/other.rs"));
        assert_eq!(frames[0].function, None);
        assert!(
            frames
                .iter()
                .skip(1)
                .all(|f| !f.function_name().starts_with("std::"))
        );
        assert_eq!(frames.len(), 4);
    }

    #[test]
    fn panic_frames_with_disabled_backtrace() {
        let frames = frames_from_panic("src/lib.rs", 7, 2, "disabled backtrace");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].line, Some(7));
    }
}
