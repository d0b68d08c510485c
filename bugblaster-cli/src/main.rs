use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "bugblaster",
    version,
    about = "Explain runtime errors and inspect BugBlaster error logs"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Map a command failure to a process exit code.
///
///   0  success
///   1  general/unknown error
///   2  configuration error
///   4  log store error
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}");
    let lower = msg.to_lowercase();

    if lower.contains("config") {
        2
    } else if lower.contains("log store")
        || lower.contains("sqlite")
        || lower.contains("corrupt log file")
    {
        4
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(commands::run(cli.command)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_config() {
        let err = anyhow::anyhow!("Cannot load config: bugblaster.toml");
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_config_validation() {
        let err = anyhow::anyhow!("Configuration error: Invalid: notify.timeout_ms must be greater than zero");
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_store() {
        let err = anyhow::anyhow!("Cannot read log store logs.json")
            .context("Store error: Corrupt log file logs.json: expected value");
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_sqlite() {
        let err = anyhow::anyhow!("SQLite error: unable to open database file");
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_general() {
        let err = anyhow::anyhow!("Cannot read trace file: trace.txt");
        assert_eq!(classify_exit_code(&err), 1);
    }
}
