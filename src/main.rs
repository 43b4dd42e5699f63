//! niagara: keeps sibling git repositories onboarded and in sync
//!
//! Run from the engine directory; every other directory under the same
//! parent is treated as a sibling repository.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use niagara::commands::{discover, falls, onboard, sync, GlobalOptions};
use niagara::utils::{init_tracing, logging::level_for};

#[derive(Debug, Parser)]
#[command(name = "niagara", version, about = "Onboard and synchronize sibling git repositories")]
struct Cli {
    /// Directory containing the sibling repositories
    #[arg(long, global = true, value_name = "DIR")]
    parent: Option<PathBuf>,

    /// Engine settings file (niagara.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of repositories processed concurrently
    #[arg(short, long, global = true, value_name = "N")]
    jobs: Option<usize>,

    /// Process one repository at a time
    #[arg(long, global = true, conflicts_with = "jobs")]
    sequential: bool,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Print reports as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Refresh markers, onboard new siblings, then sync every interval until Ctrl-C
    Falls {
        /// Seconds between sync passes
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// Onboard every eligible sibling once
    Onboard {
        /// Only list the repositories that would be onboarded
        #[arg(long)]
        dry_run: bool,
    },
    /// Sync every onboarded sibling once
    Sync {
        /// Keep syncing on a schedule until Ctrl-C
        #[arg(long)]
        watch: bool,
        /// Seconds between sync passes with --watch
        #[arg(long, value_name = "SECS", requires = "watch")]
        interval: Option<u64>,
    },
    /// List siblings and whether they still need onboarding
    Discover,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, level_for(cli.verbose));

    let options = GlobalOptions {
        parent: cli.parent,
        config: cli.config,
        jobs: cli.jobs,
        sequential: cli.sequential,
        verbose: cli.verbose,
        json: cli.json,
    };

    match cli.command {
        Commands::Falls { interval } => falls::handle_falls_command(&options, interval).await,
        Commands::Onboard { dry_run } => onboard::handle_onboard_command(&options, dry_run).await,
        Commands::Sync { watch, interval } => {
            sync::handle_sync_command(&options, watch, interval).await
        }
        Commands::Discover => discover::handle_discover_command(&options).await,
    }
}
