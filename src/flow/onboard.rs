//! Onboarding Workflow
//!
//! Registers the shared component in one repository: relocate uncommitted
//! work, pull, add the submodule, commit, push, then write the child marker.
//! A failed pull stops the run before anything is registered.

use std::path::Path;
use tracing::{debug, info};

use super::stash::{safe_stash, StashOperation};
use super::{FlowContext, StepContext, StepFailure};
use crate::core::config::ONBOARDING_COMMIT_MESSAGE;
use crate::core::marker::{refresh_marker, MarkerKind, MarkerUpdate};
use crate::core::{probe, repo_name, ProbeResult};
use crate::git::operations as ops;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardOutcome {
    /// The prober already reports the repository as onboarded
    AlreadyOnboarded,
    Onboarded {
        /// Relocated uncommitted work, if there was any
        stash: Option<StashOperation>,
        /// Whether a new commit was created (false when only the marker was missing)
        committed: bool,
    },
}

/// Onboards `path` while holding its execution lock
pub async fn onboard(ctx: &FlowContext, path: &Path) -> Result<OnboardOutcome, StepFailure> {
    let _guard = ctx.locks.acquire(path).await;
    let runner = &ctx.runner;
    let settings = &ctx.settings;

    let probed: ProbeResult = probe(runner, path, &settings.marker_file, &settings.component_dir)
        .await
        .at("probe")?;
    if !probed.is_eligible() {
        debug!(repo = %path.display(), "already onboarded");
        return Ok(OnboardOutcome::AlreadyOnboarded);
    }
    if !probed.is_version_controlled {
        return Err(StepFailure::new(
            "probe",
            crate::error::FlowError::MissingPrerequisite(format!(
                "{} is not a git working tree",
                path.display()
            )),
        ));
    }

    ctx.checkpoint("safe-stash")?;
    let stash = safe_stash(runner, path).await?;
    let recovery = stash.as_ref().map(|op| op.stash_branch.clone());
    // Failures past this point keep pointing at the relocated work
    let keep = |failure: StepFailure| match &recovery {
        Some(branch) if failure.recovery_branch.is_none() => failure.with_recovery(branch),
        _ => failure,
    };

    let credentials = ctx.credentials_for(path);

    ctx.checkpoint("pull").map_err(keep)?;
    ops::pull_ff_only(runner, path, credentials.as_ref())
        .await
        .at("pull")
        .map_err(keep)?;

    ctx.checkpoint("register-component").map_err(keep)?;
    if probed.has_nested_reference {
        debug!(repo = %path.display(), "shared component already registered");
    } else if ops::is_gitlink(runner, path, &settings.component_dir)
        .await
        .at("register-component")
        .map_err(keep)?
    {
        // Registered upstream by another checkout, only missing locally
        debug!(repo = %path.display(), "initializing registered shared component");
        ops::submodule_update_init(runner, path, &settings.component_url, &settings.component_dir)
            .await
            .at("register-component")
            .map_err(keep)?;
    } else {
        ops::submodule_add(runner, path, &settings.component_url, &settings.component_dir)
            .await
            .at("register-component")
            .map_err(keep)?;
    }

    ctx.checkpoint("commit").map_err(keep)?;
    ops::stage_all(runner, path).await.at("stage").map_err(keep)?;
    let committed = ops::has_staged_changes(runner, path)
        .await
        .at("stage")
        .map_err(keep)?;
    if committed {
        ops::commit(runner, path, ONBOARDING_COMMIT_MESSAGE)
            .await
            .at("commit")
            .map_err(keep)?;
    }

    ctx.checkpoint("push").map_err(keep)?;
    ops::push(runner, path, credentials.as_ref())
        .await
        .at("push")
        .map_err(keep)?;

    write_child_marker(ctx, path).await.map_err(keep)?;

    info!(
        repo = %path.display(),
        committed,
        stashed = stash.is_some(),
        "repository onboarded"
    );
    Ok(OnboardOutcome::Onboarded { stash, committed })
}

/// Writes the child marker and keeps it out of `git status`
async fn write_child_marker(ctx: &FlowContext, path: &Path) -> Result<(), StepFailure> {
    let step = "write-marker";
    let marker_file = &ctx.settings.marker_file;

    ops::exclude_locally(&ctx.runner, path, &format!("/{marker_file}"))
        .await
        .at(step)?;
    let url = ops::remote_url(&ctx.runner, path).await.at(step)?;

    refresh_marker(
        &path.join(marker_file),
        MarkerUpdate {
            kind: MarkerKind::Child,
            version: &ctx.version,
            dependency_versions: &ctx.tool_versions,
            repository_name: Some(repo_name(path)),
            repository_url: url,
        },
    )
    .at(step)?;
    Ok(())
}
