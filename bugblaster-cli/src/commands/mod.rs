pub mod check_config;
pub mod explain;
pub mod logs;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use bugblaster_core::config::{BugBlasterConfig, CONFIG_FILE_NAME};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Explain an error message and saved stack trace offline
    Explain(explain::ExplainArgs),
    /// List records from the configured error log
    Logs(logs::LogsArgs),
    /// Load and validate a BugBlaster config file
    CheckConfig(check_config::CheckConfigArgs),
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Explain(args) => explain::run(args).await,
        Command::Logs(args) => logs::run(args).await,
        Command::CheckConfig(args) => check_config::run(&args),
    }
}

/// Resolve the config to use: an explicit path must exist; otherwise
/// `bugblaster.toml` in the working directory is used when present.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<(BugBlasterConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(CONFIG_FILE_NAME);
            if !default.exists() {
                tracing::debug!("No {CONFIG_FILE_NAME} found, using defaults");
                return Ok((BugBlasterConfig::default(), None));
            }
            default
        }
    };

    let config = BugBlasterConfig::load(&path)
        .with_context(|| format!("Cannot load config: {}", path.display()))?;
    Ok((config, Some(path)))
}
