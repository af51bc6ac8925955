//! neoview Daemon - Main entry point
//!
//! Serves decoded electrophysiology recordings to the viewer front end.

mod api;
mod config;
mod error;
mod fetch;
mod server;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use neoview_core::summary::summarize_block;
use neoview_core::ReaderRegistry;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "neoview")]
#[command(about = "REST API for browsing electrophysiology recordings")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "neoview.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Decode a local recording, print its block summary and exit
    #[arg(long, value_name = "FILE")]
    inspect: Option<PathBuf>,

    /// Reader to use with --inspect instead of detecting one
    #[arg(long = "type", value_name = "READER", requires = "inspect")]
    io_type: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("neoview v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    if let Some(file) = &args.inspect {
        return inspect(file, args.io_type.as_deref(), &config);
    }

    info!(
        bind = %config.daemon.bind,
        cache = %config.cache.dir.display(),
        tls = config.daemon.tls.is_some(),
        "Configuration loaded"
    );

    let state = state::AppState::new(config.clone())?;
    server::run(state, &config.daemon.bind, config.daemon.tls.as_ref()).await
}

/// Decode a local file and print the block summary the API would return
fn inspect(file: &Path, io_type: Option<&str>, config: &config::Config) -> Result<()> {
    let readers = ReaderRegistry::builtin();
    let block = readers
        .read_block(file, io_type)
        .with_context(|| format!("Failed to decode {}", file.display()))?;

    let summary = summarize_block(
        &block,
        &file.to_string_lossy(),
        config::block_verdict(&config.consistency, &block.segments),
        &config.serializer,
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
