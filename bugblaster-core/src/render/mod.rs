pub mod report;

pub use report::{render_panic_report, render_report};
