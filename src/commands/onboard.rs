//! `niagara onboard`: one onboarding sweep over the siblings

use anyhow::{Context, Result};
use std::time::Instant;

use super::{build_engine, engine_dir, progress_board, render_report, GlobalOptions};
use crate::core::{repo_name, set_terminal_title, Shutdown};

pub async fn handle_onboard_command(options: &GlobalOptions, dry_run: bool) -> Result<()> {
    set_terminal_title("🌊 niagara onboard");
    let start_time = Instant::now();

    let engine_dir = engine_dir()?;
    let engine = build_engine(options, &engine_dir, Shutdown::never(), !dry_run).await?;
    let orchestrator = &engine.orchestrator;

    let names: Vec<String> = orchestrator
        .discovery()
        .candidates(orchestrator.parent())?
        .iter()
        .map(|path| repo_name(path))
        .collect();
    let board = progress_board(options, &names)?;

    let report = orchestrator
        .onboarding_sweep(dry_run, &board)
        .await
        .context("Onboarding sweep failed")?;
    render_report(options, &report, start_time.elapsed())?;

    set_terminal_title("✅ niagara");
    Ok(())
}
