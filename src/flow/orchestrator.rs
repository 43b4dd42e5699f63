//! Orchestrator: onboarding sweeps and the recurring sync schedule
//!
//! Repositories are processed concurrently, bounded by a semaphore. A failure
//! in one repository is recorded in the report and never stops the others.

use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::onboard::{onboard, OnboardOutcome};
use super::sync::{try_sync, SyncOutcome};
use super::{FlowContext, StepFailure};
use crate::core::marker::{read_marker, refresh_marker, MarkerKind, MarkerUpdate};
use crate::core::{repo_name, ProgressBoard, RepoReport, SiblingDiscovery, StatusReport};
use crate::error::{FlowError, FlowResult};
use crate::git::Status;

pub struct Orchestrator {
    ctx: FlowContext,
    discovery: SiblingDiscovery,
    parent: PathBuf,
    semaphore: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(ctx: FlowContext, parent: PathBuf, concurrency: usize) -> FlowResult<Self> {
        let concurrency = concurrency.max(1);
        let discovery = SiblingDiscovery::new(ctx.runner.clone(), &ctx.settings, concurrency)?;
        Ok(Self {
            ctx,
            discovery,
            parent,
            semaphore: Arc::new(Semaphore::new(concurrency)),
        })
    }

    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }

    pub fn discovery(&self) -> &SiblingDiscovery {
        &self.discovery
    }

    /// Rewrites the engine's root marker and every existing child marker
    /// with the current engine and tool versions
    pub async fn refresh_markers(&self) -> FlowResult<()> {
        let marker_file = &self.ctx.settings.marker_file;
        let root = self.ctx.engine_dir.join(marker_file);
        refresh_marker(
            &root,
            MarkerUpdate {
                kind: MarkerKind::Root,
                version: &self.ctx.version,
                dependency_versions: &self.ctx.tool_versions,
                repository_name: Some(repo_name(&self.ctx.engine_dir)),
                repository_url: None,
            },
        )?;
        debug!(marker = %root.display(), "root marker refreshed");

        for repo in self.discovery.onboarded(&self.parent).await? {
            let path = repo.join(marker_file);
            match read_marker(&path) {
                Ok(Some(_)) => {}
                Ok(None) => continue,
                Err(e) => {
                    warn!(marker = %path.display(), error = %e, "leaving unreadable marker alone");
                    continue;
                }
            }
            let _guard = self.ctx.locks.acquire(&repo).await;
            refresh_marker(
                &path,
                MarkerUpdate {
                    kind: MarkerKind::Child,
                    version: &self.ctx.version,
                    dependency_versions: &self.ctx.tool_versions,
                    repository_name: None,
                    repository_url: None,
                },
            )?;
        }
        Ok(())
    }

    /// Discovers eligible siblings and onboards each of them.
    ///
    /// With `dry_run` the eligible repositories are only reported.
    pub async fn onboarding_sweep(
        &self,
        dry_run: bool,
        board: &ProgressBoard,
    ) -> FlowResult<StatusReport> {
        let report = StatusReport::new("onboard");
        let eligible = self.discovery.discover(&self.parent).await?;
        info!(count = eligible.len(), dry_run, "onboarding sweep");

        if dry_run {
            for path in &eligible {
                report.record(
                    RepoReport::new(repo_name(path), path.display().to_string(), Status::Eligible)
                        .with_message("not onboarded"),
                );
            }
            return Ok(report);
        }

        let mut tasks = FuturesUnordered::new();
        for path in eligible {
            let semaphore = Arc::clone(&self.semaphore);
            let report = &report;
            tasks.push(async move {
                let name = repo_name(&path);
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let pb = board.start(&name, "onboarding...");
                let entry = match onboard(&self.ctx, &path).await {
                    Ok(OnboardOutcome::Onboarded { stash, committed }) => {
                        let mut message = if committed {
                            "committed and pushed".to_string()
                        } else {
                            "pushed".to_string()
                        };
                        if let Some(op) = stash {
                            message.push_str(&format!(", work kept on {}", op.stash_branch));
                        }
                        RepoReport::new(&name, path.display().to_string(), Status::Onboarded)
                            .with_message(message)
                    }
                    Ok(OnboardOutcome::AlreadyOnboarded) => {
                        RepoReport::new(&name, path.display().to_string(), Status::Skipped)
                            .with_message("already onboarded")
                    }
                    Err(failure) => failure_entry(&name, &path, &failure),
                };
                board.finish(&pb, &name, entry.status, &entry.message);
                report.record(entry);
            });
        }
        while tasks.next().await.is_some() {}
        drop(tasks);

        Ok(report)
    }

    /// Runs the Sync Workflow over every onboarded sibling
    pub async fn sync_tick(&self, board: &ProgressBoard) -> FlowResult<StatusReport> {
        let report = StatusReport::new("sync");
        let onboarded = self.discovery.onboarded(&self.parent).await?;
        debug!(count = onboarded.len(), "sync tick");

        let mut tasks = FuturesUnordered::new();
        for path in onboarded {
            let semaphore = Arc::clone(&self.semaphore);
            let report = &report;
            tasks.push(async move {
                let name = repo_name(&path);
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let pb = board.start(&name, "syncing...");
                let entry = match try_sync(&self.ctx, &path).await {
                    Ok(outcome) => {
                        let message = match &outcome {
                            SyncOutcome::PendingReviewBranch(branch) => branch.clone(),
                            SyncOutcome::Failed(reason) => reason.clone(),
                            _ => String::new(),
                        };
                        RepoReport::new(&name, path.display().to_string(), outcome.status())
                            .with_message(message)
                    }
                    Err(failure) => failure_entry(&name, &path, &failure),
                };
                board.finish(&pb, &name, entry.status, &entry.message);
                report.record(entry);
            });
        }
        while tasks.next().await.is_some() {}
        drop(tasks);

        Ok(report)
    }

    /// Sync ticks every `interval` until shutdown; the first tick runs immediately.
    ///
    /// A tick in progress is allowed to finish, with workflows stopping at
    /// their next checkpoint.
    pub async fn run_schedule<F>(&self, interval: Duration, mut on_tick: F) -> FlowResult<()>
    where
        F: FnMut(&StatusReport, Duration),
    {
        let mut shutdown = self.ctx.shutdown.clone();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let started = Instant::now();
                    match self.sync_tick(&ProgressBoard::hidden()).await {
                        Ok(report) => on_tick(&report, started.elapsed()),
                        // Discovery trouble (e.g. parent unreadable) is retried next tick
                        Err(e) => error!(error = %e, "sync tick failed"),
                    }
                    if self.ctx.shutdown.is_requested() {
                        break;
                    }
                }
                _ = shutdown.requested() => break,
            }
        }
        info!("schedule stopped");
        Ok(())
    }
}

fn failure_entry(name: &str, path: &Path, failure: &StepFailure) -> RepoReport {
    let status = match failure.source {
        FlowError::Cancelled => Status::Cancelled,
        FlowError::MissingPrerequisite(_) => Status::Skipped,
        _ => Status::Failed,
    };
    if status == Status::Failed {
        warn!(repo = %path.display(), step = failure.step, error = %failure.source, "workflow failed");
    } else {
        debug!(repo = %path.display(), step = failure.step, reason = %failure.source, "workflow stopped");
    }
    RepoReport::new(name, path.display().to_string(), status)
        .with_step(failure.step)
        .with_message(failure.reason())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_entry_classification() {
        let path = Path::new("/work/app");
        let skipped = failure_entry(
            "app",
            path,
            &StepFailure::new(
                "resolve-upstream",
                FlowError::MissingPrerequisite("no upstream".into()),
            ),
        );
        assert_eq!(skipped.status, Status::Skipped);
        assert_eq!(skipped.step.as_deref(), Some("resolve-upstream"));

        let cancelled = failure_entry("app", path, &StepFailure::new("pull", FlowError::Cancelled));
        assert_eq!(cancelled.status, Status::Cancelled);

        let failed = failure_entry(
            "app",
            path,
            &StepFailure::new("check-pending-stash", FlowError::ConflictingStash { count: 2 }),
        );
        assert_eq!(failed.status, Status::Failed);
        assert_eq!(failed.message, "conflicting stash");
    }
}
