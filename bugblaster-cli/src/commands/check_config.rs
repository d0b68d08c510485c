use std::path::PathBuf;

use clap::Args;

use bugblaster_core::config::LogBackend;

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Config file to check (default: ./bugblaster.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &CheckConfigArgs) -> anyhow::Result<()> {
    let (config, path) = super::load_config(args.config.as_deref())?;

    match &path {
        Some(path) => println!("Config OK: {}", path.display()),
        None => println!("Config OK: built-in defaults"),
    }
    println!();

    if config.log.enabled {
        let backend = match config.log.backend {
            LogBackend::Json => "json",
            LogBackend::Sqlite => "sqlite",
        };
        println!("  Log:      {backend} at {}", config.log.path.display());
    } else {
        println!("  Log:      disabled");
    }
    println!(
        "  Response: {:?}{}",
        config.response.default_message,
        if config.response.expose_details {
            " (with details)"
        } else {
            ""
        }
    );
    println!(
        "  Snippets: {} ms timeout, {} byte limit",
        config.snippet.read_timeout_ms, config.snippet.max_file_bytes
    );

    if config.notify.channels.is_empty() {
        println!("  Notify:   no channels");
    } else {
        let names: Vec<String> = config
            .notify
            .channels
            .keys()
            .map(ToString::to_string)
            .collect();
        println!(
            "  Notify:   {} ({} ms timeout)",
            names.join(", "),
            config.notify.timeout_ms
        );
    }
    Ok(())
}
