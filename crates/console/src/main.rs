//! Alert Console - Main Entry Point

use clap::Parser;
use console::{init_logging, run, settings::Settings, OutputMode};
use std::path::PathBuf;
use tracing::info;

/// Live alert console for field users
#[derive(Debug, Parser)]
#[command(name = "alert-console", version, about)]
struct Args {
    /// Subscribing username
    #[arg(short, long)]
    username: Option<String>,

    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Alert list output format
    #[arg(short, long, value_enum, default_value_t = OutputMode::Text)]
    output: OutputMode,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?.with_username(args.username);
    if args.json {
        settings.log.json = true;
    }

    init_logging(&settings.log);

    info!("=== Alert Console v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Connecting as {}...", settings.stream.username);

    run(settings, args.output).await?;

    Ok(())
}
