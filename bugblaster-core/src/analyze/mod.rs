pub mod engine;
pub mod rules;

pub use engine::ExplanationEngine;
pub use rules::{Evidence, Rule, RuleSet, Verdict};
