//! Safe-Stash Workflow
//!
//! Relocates uncommitted work (tracked and untracked) onto a branch named
//! `stash-<branch>-<shortHash>` and returns to the original branch. Each step
//! hands an explicit state record to the next one.
//!
//! Steps before the stash branch exists leave the repository as it was. Once
//! `git stash branch` has succeeded the work is durable, and any later failure
//! reports that branch so an operator can recover it.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{StepContext, StepFailure};
use crate::core::config::STASH_BRANCH_PREFIX;
use crate::error::{FlowError, FlowResult};
use crate::git::operations as ops;
use crate::git::{deterministic_branch_name, ProcessRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StashStep {
    CheckPendingStash,
    CreateStash,
    CaptureBranchContext,
    MaterializeStashBranch,
    ReturnToOriginalBranch,
}

impl StashStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            StashStep::CheckPendingStash => "check-pending-stash",
            StashStep::CreateStash => "create-stash",
            StashStep::CaptureBranchContext => "capture-branch-context",
            StashStep::MaterializeStashBranch => "materialize-stash-branch",
            StashStep::ReturnToOriginalBranch => "return-to-original-branch",
        }
    }
}

impl fmt::Display for StashStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed relocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashOperation {
    pub repository: PathBuf,
    pub original_branch: String,
    pub stash_branch: String,
}

/// Output of the preflight: where the work will land
#[derive(Debug)]
struct StashPlan {
    branch: String,
    stash_branch: String,
}

/// State after the stash entry was created
#[derive(Debug)]
struct Stashed {
    plan: StashPlan,
}

/// Runs the workflow when the working tree has changes; a clean tree is a no-op.
///
/// Takes no lock of its own: callers must hold the repository's
/// [`RepoLocks`](crate::core::RepoLocks) guard for the whole call, as
/// [`onboard`](super::onboard) does.
pub async fn safe_stash(
    runner: &ProcessRunner,
    path: &Path,
) -> Result<Option<StashOperation>, StepFailure> {
    let dirty = ops::has_uncommitted_changes(runner, path)
        .await
        .at("detect-changes")?;
    if !dirty {
        debug!(repo = %path.display(), "working tree clean, nothing to stash");
        return Ok(None);
    }
    relocate(runner, path).await.map(Some)
}

/// The five steps, unconditionally
async fn relocate(runner: &ProcessRunner, path: &Path) -> Result<StashOperation, StepFailure> {
    let plan = check_pending_stash(runner, path)
        .await
        .at(StashStep::CheckPendingStash.as_str())?;

    let stashed = create_stash(runner, path, plan)
        .await
        .at(StashStep::CreateStash.as_str())?;

    let operation = capture_branch_context(runner, path, stashed)
        .await
        .at(StashStep::CaptureBranchContext.as_str())?;

    let operation = materialize_stash_branch(runner, operation).await?;

    return_to_original_branch(runner, operation).await
}

/// Refuses to run next to foreign stash entries or an existing target branch
async fn check_pending_stash(runner: &ProcessRunner, path: &Path) -> FlowResult<StashPlan> {
    let stashes = ops::stash_list(runner, path).await?;
    if stashes.has_stash {
        return Err(FlowError::ConflictingStash {
            count: stashes.count,
        });
    }

    let branch = ops::current_branch(runner, path).await?.ok_or_else(|| {
        FlowError::MissingPrerequisite("detached HEAD, no branch to return to".to_string())
    })?;
    let head = ops::short_hash(runner, path, "HEAD").await?;
    let stash_branch = deterministic_branch_name(STASH_BRANCH_PREFIX, &branch, &head);

    if ops::branch_exists(runner, path, &stash_branch).await? {
        return Err(FlowError::StashBranchExists {
            branch: stash_branch,
        });
    }

    Ok(StashPlan {
        branch,
        stash_branch,
    })
}

async fn create_stash(runner: &ProcessRunner, path: &Path, plan: StashPlan) -> FlowResult<Stashed> {
    ops::stash_push_all(runner, path).await?;

    // `git stash` exits 0 without creating an entry when nothing is stashable
    let stashes = ops::stash_list(runner, path).await?;
    if stashes.count != 1 {
        return Err(FlowError::MissingPrerequisite(format!(
            "expected one stash entry after stashing, found {}",
            stashes.count
        )));
    }
    debug!(repo = %path.display(), "changes stashed");
    Ok(Stashed { plan })
}

async fn capture_branch_context(
    runner: &ProcessRunner,
    path: &Path,
    stashed: Stashed,
) -> FlowResult<StashOperation> {
    let branch = ops::current_branch(runner, path).await?;
    if branch.as_deref() != Some(stashed.plan.branch.as_str()) {
        return Err(FlowError::MissingPrerequisite(format!(
            "branch moved from '{}' while stashing",
            stashed.plan.branch
        )));
    }

    Ok(StashOperation {
        repository: path.to_path_buf(),
        original_branch: stashed.plan.branch,
        stash_branch: stashed.plan.stash_branch,
    })
}

async fn materialize_stash_branch(
    runner: &ProcessRunner,
    operation: StashOperation,
) -> Result<StashOperation, StepFailure> {
    let step = StashStep::MaterializeStashBranch.as_str();
    let path = operation.repository.as_path();

    // On failure the stash entry is still in place
    ops::stash_branch(runner, path, &operation.stash_branch)
        .await
        .at(step)?;

    let commit_work = async {
        ops::stage_all(runner, path).await?;
        let message = format!("stash commit on {}", operation.original_branch);
        ops::commit(runner, path, &message).await
    };
    if let Err(e) = commit_work.await {
        warn!(
            repo = %path.display(),
            branch = %operation.stash_branch,
            error = %e,
            "stash branch created but commit failed, work is checked out there"
        );
        return Err(StepFailure::new(step, e).with_recovery(&operation.stash_branch));
    }

    info!(
        repo = %path.display(),
        branch = %operation.stash_branch,
        "uncommitted work relocated"
    );
    Ok(operation)
}

async fn return_to_original_branch(
    runner: &ProcessRunner,
    operation: StashOperation,
) -> Result<StashOperation, StepFailure> {
    if let Err(e) = ops::checkout(runner, &operation.repository, &operation.original_branch).await {
        warn!(
            repo = %operation.repository.display(),
            branch = %operation.original_branch,
            error = %e,
            "could not return to original branch"
        );
        return Err(
            StepFailure::new(StashStep::ReturnToOriginalBranch.as_str(), e)
                .with_recovery(&operation.stash_branch),
        );
    }
    Ok(operation)
}
