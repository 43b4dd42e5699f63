//! `niagara sync`: one sync pass, or a recurring schedule with `--watch`

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::info;

use super::{build_engine, engine_dir, progress_board, render_report, GlobalOptions};
use crate::core::{repo_name, set_terminal_title, Shutdown};

pub async fn handle_sync_command(
    options: &GlobalOptions,
    watch: bool,
    interval: Option<u64>,
) -> Result<()> {
    if watch {
        return super::falls::run_watch(options, interval, false).await;
    }

    set_terminal_title("🌊 niagara sync");
    let start_time = Instant::now();

    let engine_dir = engine_dir()?;
    let engine = build_engine(options, &engine_dir, Shutdown::never(), false).await?;
    let orchestrator = &engine.orchestrator;
    info!(concurrency = engine.concurrency, "sync pass");

    let names: Vec<String> = orchestrator
        .discovery()
        .candidates(orchestrator.parent())?
        .iter()
        .map(|path| repo_name(path))
        .collect();
    let board = progress_board(options, &names)?;

    let report = orchestrator
        .sync_tick(&board)
        .await
        .context("Sync pass failed")?;
    render_report(options, &report, start_time.elapsed())?;

    set_terminal_title("✅ niagara");
    Ok(())
}

pub(crate) fn interval_or_default(interval: Option<u64>, configured: u64) -> Duration {
    Duration::from_secs(interval.unwrap_or(configured).max(1))
}
