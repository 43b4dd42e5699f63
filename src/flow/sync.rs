//! Sync Workflow
//!
//! Fetches an onboarded repository and either fast-forwards to the fetched
//! tip, when the gate authorizes it, or parks the tip on a review branch. The
//! current branch is never merged non-fast-forward and never reset.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use super::gate::explain;
use super::{FlowContext, StepContext, StepFailure};
use crate::core::config::REVIEW_BRANCH_PREFIX;
use crate::core::settings::RiverConfig;
use crate::error::FlowError;
use crate::git::operations as ops;
use crate::git::{deterministic_branch_name, Status};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "detail")]
pub enum SyncOutcome {
    UpToDate,
    FastForwarded,
    PendingReviewBranch(String),
    Failed(String),
}

impl SyncOutcome {
    pub fn status(&self) -> Status {
        match self {
            SyncOutcome::UpToDate => Status::UpToDate,
            SyncOutcome::FastForwarded => Status::FastForwarded,
            SyncOutcome::PendingReviewBranch(_) => Status::PendingReview,
            SyncOutcome::Failed(_) => Status::Failed,
        }
    }
}

impl From<StepFailure> for SyncOutcome {
    fn from(failure: StepFailure) -> Self {
        SyncOutcome::Failed(format!("{}: {}", failure.step, failure.reason()))
    }
}

/// Runs one sync and folds any failure into `SyncOutcome::Failed`
pub async fn sync_repository(ctx: &FlowContext, path: &Path) -> SyncOutcome {
    try_sync(ctx, path).await.unwrap_or_else(SyncOutcome::from)
}

/// Runs one sync while holding the repository's execution lock
pub async fn try_sync(ctx: &FlowContext, path: &Path) -> Result<SyncOutcome, StepFailure> {
    let _guard = ctx.locks.acquire(path).await;
    let runner = &ctx.runner;

    ctx.checkpoint("fetch")?;
    let branch = ops::current_branch(runner, path)
        .await
        .at("resolve-branch")?
        .ok_or_else(|| {
            StepFailure::new(
                "resolve-branch",
                FlowError::MissingPrerequisite("detached HEAD".to_string()),
            )
        })?;
    let upstream = ops::upstream_ref(runner, path)
        .await
        .at("resolve-upstream")?
        .ok_or_else(|| {
            StepFailure::new(
                "resolve-upstream",
                FlowError::MissingPrerequisite(format!("branch '{branch}' has no upstream")),
            )
        })?;

    let credentials = ctx.credentials_for(path);
    ops::fetch_prune(runner, path, credentials.as_ref())
        .await
        .at("fetch")?;

    let tip = ops::rev_parse(runner, path, &upstream).await.at("resolve-tip")?;
    if ops::is_ancestor(runner, path, &tip, "HEAD").await.at("compare")? {
        debug!(repo = %path.display(), %upstream, "up to date");
        return Ok(SyncOutcome::UpToDate);
    }

    let message = ops::commit_message(runner, path, &tip)
        .await
        .at("read-message")?;
    let policy = RiverConfig::resolve(&ctx.engine_dir, path)
        .at("load-policy")?
        .sync_policy();
    let fast_forward = ops::is_ancestor(runner, path, "HEAD", &tip)
        .await
        .at("compare")?;

    let verdict = explain(&message, &policy).and_then(|()| {
        if fast_forward {
            Ok(())
        } else {
            Err(FlowError::DivergedBranch {
                branch: branch.clone(),
            })
        }
    });

    match verdict {
        Ok(()) => {
            ctx.checkpoint("merge")?;
            match ops::merge_ff_only(runner, path, &tip).await {
                Ok(()) => {
                    info!(repo = %path.display(), %upstream, "fast-forwarded");
                    return Ok(SyncOutcome::FastForwarded);
                }
                // Local changes in the way; leave them alone
                Err(e) => warn!(repo = %path.display(), error = %e, "fast-forward refused"),
            }
        }
        Err(reason) => debug!(repo = %path.display(), %reason, "routing to review"),
    }

    ctx.checkpoint("create-review-branch")?;
    let review = review_branch(ctx, path, &branch, &tip)
        .await
        .at("create-review-branch")?;
    Ok(SyncOutcome::PendingReviewBranch(review))
}

/// Points `review-<branch>-<shortHash>` at `tip`; an existing one is reused
async fn review_branch(
    ctx: &FlowContext,
    path: &Path,
    branch: &str,
    tip: &str,
) -> Result<String, FlowError> {
    let short = ops::short_hash(&ctx.runner, path, tip).await?;
    let name = deterministic_branch_name(REVIEW_BRANCH_PREFIX, branch, &short);
    if ops::branch_exists(&ctx.runner, path, &name).await? {
        debug!(repo = %path.display(), branch = %name, "review branch already exists");
    } else {
        ops::create_branch(&ctx.runner, path, &name, tip).await?;
        info!(repo = %path.display(), branch = %name, "review branch created");
    }
    Ok(name)
}
