//! plebis - Erowid experience report harvester
//!
//! Walks the experience ID space, stores every report in PostgreSQL and
//! replicates visible ones into Elasticsearch.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "plebis")]
#[command(about = "Erowid experience report harvester")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./plebis.toml or ~/.config/plebis/config.toml)
    #[arg(short, long, global = true, env = "PLEBIS_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest reports into the store and search index
    Harvest(cmd::harvest::HarvestArgs),
    /// Replay stored visible reports into the search index
    Reindex(cmd::reindex::ReindexArgs),
    /// Create the store table and indexes
    Init,
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(plebis_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug; progress bars show activity
    //   non-TTY: info unless --debug; logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    plebis_core::init_logging(quiet, cli.debug, multi).context("Failed to initialize logging")?;

    let config = if let Some(path) = cli.config {
        Config::load_from(&path)?
    } else {
        Config::load()?
    };

    if let Command::Config = cli.command {
        cmd::show_config(&config);
        return Ok(());
    }

    plebis_core::install_signal_handlers().context("Failed to install signal handlers")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    runtime.block_on(async move {
        match cli.command {
            Command::Harvest(args) => cmd::harvest::run(args, &config, &progress).await,
            Command::Reindex(args) => cmd::reindex::run(args, &config).await,
            Command::Init => cmd::init::run(&config).await,
            Command::Config => Ok(()),
        }
    })
}
