//! `niagara falls`: boot, onboard, then keep every sibling synced until Ctrl-C

use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{info, warn};

use super::sync::interval_or_default;
use super::{build_engine, engine_dir, render_report, GlobalOptions};
use crate::core::{set_terminal_title, shutdown_channel, ProgressBoard, ShutdownTrigger};

pub async fn handle_falls_command(options: &GlobalOptions, interval: Option<u64>) -> Result<()> {
    run_watch(options, interval, true).await
}

/// Runs the recurring schedule; with `boot` the markers are refreshed and an
/// onboarding sweep runs first
pub(crate) async fn run_watch(
    options: &GlobalOptions,
    interval: Option<u64>,
    boot: bool,
) -> Result<()> {
    set_terminal_title("🌊 niagara");
    let (trigger, shutdown) = shutdown_channel();
    spawn_ctrl_c_handler(trigger);

    let engine_dir = engine_dir()?;
    let engine = build_engine(options, &engine_dir, shutdown, boot).await?;
    let orchestrator = &engine.orchestrator;

    if boot {
        if let Err(e) = orchestrator.refresh_markers().await {
            warn!(error = %e, "marker refresh failed");
        }

        let start_time = Instant::now();
        let report = orchestrator
            .onboarding_sweep(false, &ProgressBoard::hidden())
            .await
            .context("Onboarding sweep failed")?;
        if !report.is_empty() {
            render_report(options, &report, start_time.elapsed())?;
        }
    }

    let interval = interval_or_default(interval, engine.settings.sync_interval_secs);
    info!(
        parent = %orchestrator.parent().display(),
        interval_secs = interval.as_secs(),
        "watching siblings"
    );

    orchestrator
        .run_schedule(interval, |report, elapsed| {
            // Quiet ticks are not worth a report unless JSON output was asked for
            let quiet = report.pending_review.load(std::sync::atomic::Ordering::Relaxed) == 0
                && !report.has_failures();
            if options.json || !quiet {
                if let Err(e) = render_report(options, report, elapsed) {
                    warn!(error = %e, "could not render report");
                }
            }
        })
        .await?;

    set_terminal_title("✅ niagara");
    Ok(())
}

fn spawn_ctrl_c_handler(trigger: ShutdownTrigger) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested, finishing in-flight steps");
            trigger.trigger();
        }
    });
}
