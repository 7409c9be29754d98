//! Wavecache CLI
//!
//! Command-line interface for inspecting wavetable lookups.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wavecache::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Wavecache v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Wavecache v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Probe {
            freqs,
            query,
            buffer_size,
            config,
        } => commands::run_probe(&freqs, query, buffer_size, config.as_deref())
            .with_context(|| format!("probe of {} Hz failed", query)),
        Commands::CheckConfig { path } => commands::check_config(&path)
            .with_context(|| format!("invalid configuration {}", path.display())),
    }
}
