// Ordered heuristic rules over the error message and source snippet.
// Evaluation is first-match-wins; see `RuleSet::first_match`.

use std::sync::LazyLock;

use regex::Regex;

static NOT_A_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<name>[^\s'"`]+) is not a function"#)
        .expect("NOT_A_FUNCTION regex pattern is valid")
});

static NOT_DEFINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<name>[^\s'"`]+) is not defined"#).expect("NOT_DEFINED regex pattern is valid")
});

static AWAIT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bawait\b").expect("AWAIT_MARKER regex pattern is valid"));

/// Substrings that suggest a line already checks for a missing value.
const GUARD_PATTERNS: &[&str] = &[
    "?.",
    "??",
    "!= null",
    "!== null",
    "!= undefined",
    "!== undefined",
    "typeof ",
    "if (",
    "if(",
    "&&",
    "if let ",
    ".is_some()",
    ".unwrap_or",
];

/// Keywords that introduce a binding.
const DECLARATION_KEYWORDS: &[&str] = &[
    "let", "const", "var", "function", "class", "import", "fn", "static", "struct", "enum", "use",
];

/// What a rule may inspect.
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    pub message: &'a str,
    pub snippet: Option<&'a str>,
    /// Baseline location string (file, line, function, snippet).
    pub location: &'a str,
}

/// Replacement text produced by a rule. `None` keeps the baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub reason: Option<String>,
    pub tip: Option<String>,
}

/// One `(predicate, handler)` pair of the rule table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub predicate: fn(&Evidence<'_>) -> bool,
    pub handler: fn(&Evidence<'_>) -> Verdict,
}

/// Ordered rule table. Earlier rules take priority.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    /// Leading rules that come from [`RuleSet::standard`].
    builtin: usize,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleSet {
    /// The built-in rules in priority order: null access, not a function,
    /// not defined, unhandled async failure.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                Rule {
                    name: "null-access",
                    predicate: is_null_access,
                    handler: explain_null_access,
                },
                Rule {
                    name: "not-a-function",
                    predicate: is_not_a_function,
                    handler: explain_not_a_function,
                },
                Rule {
                    name: "not-defined",
                    predicate: is_not_defined,
                    handler: explain_not_defined,
                },
                Rule {
                    name: "unhandled-async",
                    predicate: is_unhandled_async,
                    handler: explain_unhandled_async,
                },
            ],
            builtin: 4,
        }
    }

    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            builtin: 0,
        }
    }

    /// Append a rule at the lowest priority.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule whose predicate accepts the evidence.
    pub fn first_match(&self, evidence: &Evidence<'_>) -> Option<&Rule> {
        self.rules.iter().find(|rule| (rule.predicate)(evidence))
    }

    /// Like [`first_match`](Self::first_match), restricted to the built-in
    /// rules. Pushed rules are skipped.
    pub fn first_builtin_match(&self, evidence: &Evidence<'_>) -> Option<&Rule> {
        self.rules[..self.builtin]
            .iter()
            .find(|rule| (rule.predicate)(evidence))
    }
}

// ── null / undefined access ─────────────────────────────────────────

fn is_null_access(ev: &Evidence<'_>) -> bool {
    ev.message.contains("undefined") || ev.message.contains("null")
}

fn explain_null_access(ev: &Evidence<'_>) -> Verdict {
    let reason = null_access_parts(ev.message)
        .map(|(action, value)| format!("Attempted to {action} on {value}."));

    let mut tip = String::from(
        "Add a guard check to make sure the value is not null or undefined before it is used.",
    );
    if let Some(code) = ev.snippet {
        if !GUARD_PATTERNS.iter().any(|p| code.contains(p)) {
            tip.push_str(&format!(" The code \"{code}\" uses it without a guard."));
        }
    }

    Verdict {
        reason,
        tip: Some(tip),
    }
}

/// `"Cannot read properties of null (reading 'x')"` → `("read properties", "null")`.
fn null_access_parts(message: &str) -> Option<(&str, &str)> {
    let mut parts = message.split(" of ");
    let head = parts.next()?.trim();
    let tail = parts.next()?;
    let (_, action) = head.split_once(char::is_whitespace)?;
    let action = action.trim();
    let value = tail.split_whitespace().next()?;
    if action.is_empty() {
        return None;
    }
    Some((action, value))
}

// ── `x is not a function` ───────────────────────────────────────────

fn is_not_a_function(ev: &Evidence<'_>) -> bool {
    ev.message.contains("is not a function")
}

fn explain_not_a_function(ev: &Evidence<'_>) -> Verdict {
    let Some(name) = captured_name(&NOT_A_FUNCTION, ev.message) else {
        return Verdict::default();
    };

    let mut tip = format!("Verify that '{name}' is defined and holds a function before calling it.");
    if let Some(code) = ev.snippet {
        if code.contains(name) {
            tip.push_str(&format!(
                " The code \"{code}\" calls '{name}'; check how it is imported or assigned."
            ));
        }
    }

    Verdict {
        reason: Some(format!("'{name}' was called but isn't a function.")),
        tip: Some(tip),
    }
}

// ── `x is not defined` ──────────────────────────────────────────────

fn is_not_defined(ev: &Evidence<'_>) -> bool {
    ev.message.contains("is not defined")
}

fn explain_not_defined(ev: &Evidence<'_>) -> Verdict {
    let Some(name) = captured_name(&NOT_DEFINED, ev.message) else {
        return Verdict::default();
    };

    let mut tip = format!("Define '{name}' before using it, or check its spelling.");
    if let Some(code) = ev.snippet {
        if !declares(code, name) {
            tip.push_str(&format!(
                " The code \"{code}\" uses '{name}' without declaring it."
            ));
        }
    }

    Verdict {
        reason: Some(format!("'{name}' is not defined in the current scope.")),
        tip: Some(tip),
    }
}

/// Whether `code` binds `name` after a declaration keyword on the same line.
fn declares(code: &str, name: &str) -> bool {
    let leaf = name.rsplit('.').next().unwrap_or(name);
    let tokens: Vec<&str> = code
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|t| !t.is_empty())
        .collect();
    tokens.iter().enumerate().any(|(i, token)| {
        DECLARATION_KEYWORDS.contains(token) && tokens[i + 1..].contains(&leaf)
    })
}

// ── unhandled async failure ─────────────────────────────────────────

fn is_unhandled_async(ev: &Evidence<'_>) -> bool {
    ev.message.contains(crate::types::UNHANDLED_REJECTION)
        || ev.snippet.is_some_and(|code| AWAIT_MARKER.is_match(code))
}

fn explain_unhandled_async(ev: &Evidence<'_>) -> Verdict {
    let mut tip = String::from(
        "Add error handling around the asynchronous call (try/catch, .catch(), or propagate the error) so failures are handled.",
    );
    match ev.snippet {
        Some(code) => {
            let protected = ["try", "catch", "?"].iter().any(|p| code.contains(p));
            if AWAIT_MARKER.is_match(code) && !protected {
                tip.push_str(&format!(
                    " The code \"{code}\" awaits without a surrounding try/catch."
                ));
            }
        }
        None if ev.location != crate::types::UNKNOWN_LOCATION => {
            tip.push_str(&format!(" Start with the call at {}.", ev.location));
        }
        None => {}
    }

    Verdict {
        reason: Some("An asynchronous operation likely failed without being handled.".into()),
        tip: Some(tip),
    }
}

fn captured_name<'m>(pattern: &Regex, message: &'m str) -> Option<&'m str> {
    pattern
        .captures(message)
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence<'a>(message: &'a str, snippet: Option<&'a str>) -> Evidence<'a> {
        Evidence {
            message,
            snippet,
            location: "app.js:1 (in main)",
        }
    }

    fn matched(message: &str, snippet: Option<&str>) -> Option<&'static str> {
        RuleSet::standard()
            .first_match(&evidence(message, snippet))
            .map(|r| r.name)
    }

    #[test]
    fn standard_order() {
        let names: Vec<_> = RuleSet::standard().rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            ["null-access", "not-a-function", "not-defined", "unhandled-async"]
        );
    }

    #[test]
    fn dispatch_by_message() {
        assert_eq!(
            matched("Cannot read properties of null (reading 'name')", None),
            Some("null-access")
        );
        assert_eq!(matched("foo is not a function", None), Some("not-a-function"));
        assert_eq!(matched("bar is not defined", None), Some("not-defined"));
        assert_eq!(
            matched("Unhandled Rejection: timeout", None),
            Some("unhandled-async")
        );
        assert_eq!(matched("disk full", None), None);
    }

    #[test]
    fn null_access_beats_async() {
        assert_eq!(
            matched("Unhandled Rejection: x is undefined", Some("await load();")),
            Some("null-access")
        );
    }

    #[test]
    fn snippet_await_triggers_async_rule() {
        assert_eq!(
            matched("request failed", Some("const data = await fetchUser(id);")),
            Some("unhandled-async")
        );
        assert_eq!(
            matched("request failed", Some("let user = repo.load(id).await;")),
            Some("unhandled-async")
        );
        // `awaiting` is not a suspension point
        assert_eq!(matched("request failed", Some("awaiting = true;")), None);
    }

    #[test]
    fn null_access_parts_extraction() {
        assert_eq!(
            null_access_parts("Cannot read properties of null (reading 'name')"),
            Some(("read properties", "null"))
        );
        assert_eq!(
            null_access_parts("Cannot read property 'id' of undefined"),
            Some(("read property 'id'", "undefined"))
        );
        assert_eq!(null_access_parts("value is undefined"), None);
        assert_eq!(null_access_parts("Cannot of null"), None);
        assert_eq!(null_access_parts("Cannot read of "), None);
    }

    #[test]
    fn null_access_without_shape_keeps_baseline_reason() {
        let verdict = explain_null_access(&evidence("value is undefined", None));
        assert_eq!(verdict.reason, None);
        assert!(verdict.tip.unwrap().contains("guard check"));
    }

    #[test]
    fn null_access_guard_clause() {
        let unguarded = explain_null_access(&evidence(
            "Cannot read properties of null (reading 'name')",
            Some("return user.name;"),
        ));
        assert!(
            unguarded
                .tip
                .as_deref()
                .unwrap()
                .contains("The code \"return user.name;\" uses it without a guard.")
        );

        let guarded = explain_null_access(&evidence(
            "Cannot read properties of null (reading 'name')",
            Some("return user?.name;"),
        ));
        assert!(!guarded.tip.unwrap().contains("The code"));
    }

    #[test]
    fn not_a_function_names_callee() {
        let verdict = explain_not_a_function(&evidence(
            "TypeError: api.fetchUser is not a function",
            Some("await api.fetchUser(id);"),
        ));
        assert_eq!(
            verdict.reason.as_deref(),
            Some("'api.fetchUser' was called but isn't a function.")
        );
        assert!(verdict.tip.unwrap().contains("check how it is imported or assigned"));
    }

    #[test]
    fn not_a_function_without_name_keeps_baseline() {
        assert_eq!(
            explain_not_a_function(&evidence("is not a function", None)),
            Verdict::default()
        );
    }

    #[test]
    fn not_defined_declaration_check() {
        let undeclared = explain_not_defined(&evidence("bar is not defined", Some("bar.run();")));
        assert_eq!(
            undeclared.reason.as_deref(),
            Some("'bar' is not defined in the current scope.")
        );
        assert!(undeclared.tip.unwrap().contains("without declaring it"));

        let declared = explain_not_defined(&evidence(
            "bar is not defined",
            Some("const bar = require('./bar');"),
        ));
        assert!(!declared.tip.unwrap().contains("without declaring it"));
    }

    #[test]
    fn declares_tokenizes() {
        assert!(declares("let { bar, baz } = load();", "bar"));
        assert!(declares("function bar() {", "bar"));
        assert!(!declares("bar();", "bar"));
        assert!(!declares("let barista = 1;", "bar"));
    }

    #[test]
    fn async_clause_only_without_protection() {
        let bare = explain_unhandled_async(&evidence("x", Some("await db.save(user);")));
        assert!(bare.tip.unwrap().contains("awaits without a surrounding try/catch"));

        let wrapped = explain_unhandled_async(&evidence(
            "x",
            Some("try { await db.save(user); } catch (e) {}"),
        ));
        assert!(!wrapped.tip.unwrap().contains("awaits without"));

        let propagated = explain_unhandled_async(&evidence("x", Some("db.save(user).await?;")));
        assert!(!propagated.tip.unwrap().contains("awaits without"));
    }

    #[test]
    fn async_without_snippet_points_at_location() {
        let located = explain_unhandled_async(&evidence("Unhandled Rejection: timeout", None));
        assert!(
            located
                .tip
                .unwrap()
                .ends_with(" Start with the call at app.js:1 (in main).")
        );

        let unknown = explain_unhandled_async(&Evidence {
            message: "Unhandled Rejection: timeout",
            snippet: None,
            location: crate::types::UNKNOWN_LOCATION,
        });
        assert!(!unknown.tip.unwrap().contains("Start with the call"));

        let with_code = explain_unhandled_async(&evidence("x", Some("await db.save(user);")));
        assert!(!with_code.tip.unwrap().contains("Start with the call"));
    }

    #[test]
    fn push_appends_lowest_priority() {
        fn always(_: &Evidence<'_>) -> bool {
            true
        }
        fn disk(_: &Evidence<'_>) -> Verdict {
            Verdict {
                reason: Some("The disk is full.".into()),
                tip: None,
            }
        }

        let mut rules = RuleSet::standard();
        rules.push(Rule {
            name: "catch-all",
            predicate: always,
            handler: disk,
        });
        assert_eq!(
            rules.first_match(&evidence("bar is not defined", None)).map(|r| r.name),
            Some("not-defined")
        );
        assert_eq!(
            rules.first_match(&evidence("ENOSPC", None)).map(|r| r.name),
            Some("catch-all")
        );

        assert!(rules.first_builtin_match(&evidence("ENOSPC", None)).is_none());
        assert_eq!(
            rules
                .first_builtin_match(&evidence("bar is not defined", None))
                .map(|r| r.name),
            Some("not-defined")
        );

        let mut custom = RuleSet::empty();
        custom.push(rules.rules()[4]);
        assert!(custom.first_builtin_match(&evidence("ENOSPC", None)).is_none());
    }
}
