//! CLI command handlers
//!
//! Each handler builds the engine from the global options, runs one
//! orchestrator operation and renders the resulting report.

pub mod discover;
pub mod falls;
pub mod onboard;
pub mod sync;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::{
    get_git_concurrency, probe_tool_versions, EngineSettings, ProgressBoard, Shutdown,
    SpringStore, StatusReport,
};
use crate::flow::{FlowContext, Orchestrator};
use crate::git::ProcessRunner;

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Directory whose children are synchronized; defaults to the engine dir's parent
    pub parent: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub sequential: bool,
    pub verbose: bool,
    /// Print the report as JSON on stdout instead of the human summary
    pub json: bool,
}

/// Everything a handler needs after configuration is resolved
pub(crate) struct Engine {
    pub orchestrator: Orchestrator,
    pub settings: EngineSettings,
    pub concurrency: usize,
}

/// Resolves settings, credentials and concurrency for the engine running in `engine_dir`
pub(crate) async fn build_engine(
    options: &GlobalOptions,
    engine_dir: &Path,
    shutdown: Shutdown,
    probe_tools: bool,
) -> Result<Engine> {
    let settings = EngineSettings::load(options.config.as_deref(), engine_dir)
        .context("Failed to load engine settings")?;
    let credentials = SpringStore::load(engine_dir).context("Failed to load credentials")?;
    debug!(entries = credentials.len(), "credential records loaded");

    let runner = ProcessRunner::new(Duration::from_secs(settings.command_timeout_secs));
    let parent = match &options.parent {
        Some(parent) => parent.clone(),
        None => settings.resolve_parent(engine_dir)?,
    };
    let concurrency = get_git_concurrency(options.jobs.or(settings.jobs), options.sequential);

    let mut ctx = FlowContext::new(
        runner.clone(),
        settings.clone(),
        Arc::new(credentials),
        engine_dir.to_path_buf(),
    )
    .with_shutdown(shutdown);
    if probe_tools {
        let versions = probe_tool_versions(&runner, &settings.tools, engine_dir).await;
        ctx = ctx.with_tool_versions(versions);
    }

    let orchestrator = Orchestrator::new(ctx, parent, concurrency)
        .context("Failed to initialise orchestrator")?;
    Ok(Engine {
        orchestrator,
        settings,
        concurrency,
    })
}

/// Engine directory: the working directory the CLI was started from
pub(crate) fn engine_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to read the current directory")
}

pub(crate) fn progress_board(options: &GlobalOptions, names: &[String]) -> Result<ProgressBoard> {
    if options.json {
        Ok(ProgressBoard::hidden())
    } else {
        Ok(ProgressBoard::new(names)?)
    }
}

/// Prints the report in the requested format
pub(crate) fn render_report(options: &GlobalOptions, report: &StatusReport, elapsed: Duration) -> Result<()> {
    if options.json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
        return Ok(());
    }

    println!();
    println!("{}", report.generate_summary(elapsed));
    let detailed = report.generate_detailed_summary();
    if !detailed.is_empty() {
        println!("\n{}", "━".repeat(70));
        println!("{}", detailed);
        println!("{}", "━".repeat(70));
    }
    Ok(())
}
