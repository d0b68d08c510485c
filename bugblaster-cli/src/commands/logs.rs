use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use bugblaster_core::store;

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Config file naming the log store (default: ./bugblaster.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show only the N most recent records
    #[arg(long)]
    pub limit: Option<usize>,

    /// Print records as a JSON array
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: LogsArgs) -> anyhow::Result<()> {
    let (config, _) = super::load_config(args.config.as_deref())?;

    let Some(store) = store::open_configured(&config.log).context("Cannot open log store")? else {
        anyhow::bail!("Logging is disabled in the loaded config ([log] enabled = false)");
    };

    let mut records = store
        .records()
        .await
        .with_context(|| format!("Cannot read log store {}", store.location()))?;

    if let Some(limit) = args.limit {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No records in {}", store.location());
        return Ok(());
    }

    println!("{} record(s) from {}", records.len(), store.location());
    for record in &records {
        println!();
        println!(
            "  {}  {}  {}",
            record.timestamp,
            record.path.as_deref().unwrap_or("-"),
            record.message
        );
        println!("    Where: {}", record.location);
        println!("    Why:   {}", record.reason);
        println!("    Tip:   {}", record.tip);
    }
    Ok(())
}
