use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use bugblaster_core::analyze::ExplanationEngine;
use bugblaster_core::extract::{FrameExtractor, FsSnippetReader, TextTraceExtractor};
use bugblaster_core::render::render_report;
use bugblaster_core::types::{RaisedError, RequestContext};

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Error message to explain
    #[arg(short, long)]
    pub message: String,

    /// File holding the stack trace (Node.js or Rust backtrace text)
    #[arg(long)]
    pub trace_file: Option<PathBuf>,

    /// Request method, used with --path
    #[arg(long, default_value = "GET", requires = "path")]
    pub method: String,

    /// Request path being served when the error was raised
    #[arg(long)]
    pub path: Option<String>,

    /// The request had no parsed body
    #[arg(long, requires = "path")]
    pub no_body: bool,

    /// Config file for snippet limits (default: ./bugblaster.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the explanation as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ExplainArgs) -> anyhow::Result<()> {
    let (config, _) = super::load_config(args.config.as_deref())?;

    let frames = match &args.trace_file {
        Some(path) => {
            let trace = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Cannot read trace file: {}", path.display()))?;
            TextTraceExtractor.extract(&trace)
        }
        None => Vec::new(),
    };
    tracing::debug!(frames = frames.len(), "Parsed trace");

    let request = args
        .path
        .as_deref()
        .map(|path| RequestContext::new(args.method.to_uppercase(), path, !args.no_body));

    let engine = ExplanationEngine::new(Arc::new(FsSnippetReader::from_config(&config.snippet)));
    let error = RaisedError::new(args.message);
    let explanation = engine.explain(&error, &frames, request.as_ref()).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
    } else {
        println!("{}", render_report(&error, &explanation));
        if let Some(trace) = &explanation.trace {
            println!("{trace}");
        }
    }
    Ok(())
}
