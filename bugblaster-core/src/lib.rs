//! BugBlaster core library: heuristic explanations for runtime errors.
//!
//! The main entry point is [`guard::ErrorGuard`], which turns a failed
//! request into an [`types::Explanation`], a persisted [`types::LogRecord`],
//! optional channel notifications, and the response sent to the client.
//! Panics outside request handling are covered by
//! [`hook::install_global_handler`].

pub mod analyze;
pub mod config;
pub mod error;
pub mod extract;
pub mod guard;
pub mod hook;
pub mod notify;
pub mod record;
pub mod render;
pub mod store;
pub mod types;
