// Integration test utilities and fixture management for BugBlaster.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use bugblaster_core::analyze::ExplanationEngine;
use bugblaster_core::config::{BugBlasterConfig, LogBackend};
use bugblaster_core::extract::FsSnippetReader;
use bugblaster_core::guard::ErrorGuard;
use bugblaster_core::record::{Clock, FixedClock};
use bugblaster_core::store::{self, LogStore};

/// Express-style route file; line numbers are referenced by the traces below.
pub const ROUTES_JS: &str = "const express = require('express');
const router = express.Router();

router.post('/users', (req, res) => {
  const name = req.body.user.name;
  res.json({ name });
});

router.get('/report', async (req, res) => {
  const data = await fetchReport(req.query.id);
  res.json(data);
});

router.get('/legacy', (req, res) => {
  legacyHandler(req, res);
});

router.get('/totals', (req, res) => {
  res.json({ total: computeTotal(req.query) });
});

router.get('/safe', (req, res) => {
  const id = req.params && req.params.id;
  res.json({ id });
});
";

/// Line of `ROUTES_JS` reading `req.body.user.name`.
pub const LINE_BODY_ACCESS: u32 = 5;
/// Line of `ROUTES_JS` awaiting `fetchReport`.
pub const LINE_AWAIT: u32 = 10;
/// Line of `ROUTES_JS` calling `legacyHandler`.
pub const LINE_CALL: u32 = 15;
/// Line of `ROUTES_JS` calling `computeTotal`.
pub const LINE_UNDECLARED: u32 = 19;
/// Line of `ROUTES_JS` with a guarded property access.
pub const LINE_GUARDED: u32 = 23;

/// Timestamp every fixture guard stamps on its records.
pub const FIXED_TIMESTAMP: &str = "2024-05-01T12:30:00.000Z";

/// A temporary application tree with source files and room for logs.
#[derive(Debug)]
pub struct TestApp {
    pub dir: tempfile::TempDir,
}

impl TestApp {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create an app with `src/routes.js`.
    pub fn express_routes() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/routes.js"), ROUTES_JS).unwrap();
        Self { dir }
    }

    pub fn routes_file(&self) -> PathBuf {
        self.path().join("src/routes.js")
    }

    /// A Node.js style trace whose innermost frame is `routes.js:line`,
    /// called from the Express router layer.
    pub fn node_trace(&self, headline: &str, function: &str, line: u32) -> String {
        format!(
            "{headline}\n    at {function} ({}:{line}:15)\n    at Layer.handle [as handle_request] ({}/node_modules/express/lib/router/layer.js:95:5)\n    at next ({}/node_modules/express/lib/router/route.js:149:13)",
            self.routes_file().display(),
            self.path().display(),
            self.path().display(),
        )
    }

    /// Default config with the log stored inside this app's directory.
    pub fn config(&self, backend: LogBackend) -> BugBlasterConfig {
        let mut config = BugBlasterConfig::default();
        config.log.backend = backend;
        config.log.path = match backend {
            LogBackend::Json => self.path().join("logs/bugblaster-logs.json"),
            LogBackend::Sqlite => self.path().join("logs/bugblaster.db"),
        };
        config
    }

    /// Guard reading snippets from disk, logging to `backend`, with a fixed clock.
    pub fn guard(&self, backend: LogBackend) -> (ErrorGuard, Arc<dyn LogStore>) {
        let config = self.config(backend);
        let store = store::open_configured(&config.log)
            .unwrap()
            .expect("logging enabled");
        let engine = ExplanationEngine::new(Arc::new(FsSnippetReader::from_config(&config.snippet)));
        let guard = ErrorGuard::builder()
            .response(config.response.clone())
            .engine(Arc::new(engine))
            .store(Arc::clone(&store))
            .clock(fixed_clock())
            .build();
        (guard, store)
    }
}

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
    ))
}

/// Captured `std::backtrace` text for a panic in `app::handlers::load_user`.
pub const RUST_BACKTRACE: &str = "   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: std::panicking::begin_panic_handler::{{closure}}
             at /rustc/abc/library/std/src/panicking.rs:665:13
   2: core::panicking::panic_fmt
             at /rustc/abc/library/core/src/panicking.rs:74:14
   3: app::handlers::load_user
             at ./src/handlers.rs:42:9
   4: app::main
             at ./src/main.rs:7:5";
