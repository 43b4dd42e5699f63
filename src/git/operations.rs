//! Typed git operations built on the process runner

use std::path::Path;
use tracing::debug;

use super::credentials::Credentials;
use super::porcelain::{
    parse_current_branch, parse_stash_list, parse_status_porcelain, StashList, WorkingTreeStatus,
};
use super::runner::ProcessRunner;
use crate::error::{FlowError, FlowResult};

// Git command arguments
const GIT_TOPLEVEL_ARGS: &[&str] = &["rev-parse", "--show-toplevel"];
const GIT_STATUS_PORCELAIN_ARGS: &[&str] = &["status", "--porcelain"];
const GIT_STASH_LIST_ARGS: &[&str] = &["stash", "list"];
const GIT_STASH_PUSH_ARGS: &[&str] = &[
    "stash",
    "push",
    "--include-untracked",
    "-m",
    "niagara: safe-stash",
];
const GIT_REV_PARSE_HEAD_ARGS: &[&str] = &["rev-parse", "--abbrev-ref", "HEAD"];
const GIT_UPSTREAM_ARGS: &[&str] = &[
    "rev-parse",
    "--abbrev-ref",
    "--symbolic-full-name",
    "@{upstream}",
];
const GIT_ADD_ALL_ARGS: &[&str] = &["add", "--all"];
const GIT_DIFF_CACHED_ARGS: &[&str] = &["diff", "--cached", "--quiet"];
const GIT_PULL_ARGS: &[&str] = &["pull", "--ff-only"];
const GIT_PUSH_ARGS: &[&str] = &["push"];
const GIT_FETCH_PRUNE_ARGS: &[&str] = &["fetch", "--prune", "--quiet"];
const GIT_REMOTE_URL_ARGS: &[&str] = &["remote", "get-url", "origin"];
const GITLINK_MODE: &str = "160000 ";
const GIT_EXCLUDE_PATH_ARGS: &[&str] = &["rev-parse", "--git-path", "info/exclude"];

/// Returns true when `path` is the top level of a git working tree.
///
/// A directory that merely sits inside some other repository is not a root,
/// which keeps a plain folder nested in a parent repo from passing as valid.
pub async fn is_work_tree_root(runner: &ProcessRunner, path: &Path) -> FlowResult<bool> {
    if !path.is_dir() {
        return Ok(false);
    }

    let output = runner.git(path, GIT_TOPLEVEL_ARGS).await?;
    if !output.success() {
        return Ok(false);
    }

    let expected = path
        .canonicalize()
        .map_err(|source| FlowError::io(path, source))?;
    let toplevel = Path::new(output.stdout.trim());
    Ok(toplevel
        .canonicalize()
        .map(|found| found == expected)
        .unwrap_or(false))
}

/// Classifies the working tree via `git status --porcelain`
pub async fn working_tree_status(
    runner: &ProcessRunner,
    path: &Path,
) -> FlowResult<WorkingTreeStatus> {
    let output = runner.git_checked(path, GIT_STATUS_PORCELAIN_ARGS).await?;
    Ok(parse_status_porcelain(&output.stdout))
}

/// Checks for tracked or untracked changes; read-only
pub async fn has_uncommitted_changes(runner: &ProcessRunner, path: &Path) -> FlowResult<bool> {
    Ok(working_tree_status(runner, path).await?.has_changes)
}

pub async fn stash_list(runner: &ProcessRunner, path: &Path) -> FlowResult<StashList> {
    let output = runner.git_checked(path, GIT_STASH_LIST_ARGS).await?;
    Ok(parse_stash_list(&output.stdout))
}

/// Moves tracked and untracked changes into a new stash entry
pub async fn stash_push_all(runner: &ProcessRunner, path: &Path) -> FlowResult<()> {
    runner.git_checked(path, GIT_STASH_PUSH_ARGS).await?;
    Ok(())
}

/// Creates `branch` from the newest stash entry and checks it out
pub async fn stash_branch(runner: &ProcessRunner, path: &Path, branch: &str) -> FlowResult<()> {
    runner.git_checked(path, &["stash", "branch", branch]).await?;
    Ok(())
}

/// Current branch name, `None` on a detached HEAD
pub async fn current_branch(runner: &ProcessRunner, path: &Path) -> FlowResult<Option<String>> {
    let output = runner.git_checked(path, GIT_REV_PARSE_HEAD_ARGS).await?;
    Ok(parse_current_branch(&output.stdout))
}

pub async fn short_hash(runner: &ProcessRunner, path: &Path, rev: &str) -> FlowResult<String> {
    let output = runner.git_checked(path, &["rev-parse", "--short", rev]).await?;
    Ok(output.stdout.trim().to_string())
}

pub async fn rev_parse(runner: &ProcessRunner, path: &Path, rev: &str) -> FlowResult<String> {
    let output = runner
        .git_checked(path, &["rev-parse", "--verify", "--quiet", rev])
        .await?;
    Ok(output.stdout.trim().to_string())
}

pub async fn branch_exists(runner: &ProcessRunner, path: &Path, branch: &str) -> FlowResult<bool> {
    let reference = format!("refs/heads/{branch}");
    let output = runner
        .git(path, &["show-ref", "--verify", "--quiet", &reference])
        .await?;
    Ok(output.success())
}

/// Creates `branch` at `rev` without checking it out
pub async fn create_branch(
    runner: &ProcessRunner,
    path: &Path,
    branch: &str,
    rev: &str,
) -> FlowResult<()> {
    runner.git_checked(path, &["branch", branch, rev]).await?;
    Ok(())
}

pub async fn checkout(runner: &ProcessRunner, path: &Path, branch: &str) -> FlowResult<()> {
    runner.git_checked(path, &["checkout", branch]).await?;
    Ok(())
}

pub async fn stage_all(runner: &ProcessRunner, path: &Path) -> FlowResult<()> {
    runner.git_checked(path, GIT_ADD_ALL_ARGS).await?;
    Ok(())
}

/// Checks if the index differs from HEAD
pub async fn has_staged_changes(runner: &ProcessRunner, path: &Path) -> FlowResult<bool> {
    let output = runner.git(path, GIT_DIFF_CACHED_ARGS).await?;
    match output.exit_code {
        0 => Ok(false),
        1 => Ok(true),
        code => Err(FlowError::ProcessFailure {
            command: "git diff --cached --quiet".to_string(),
            exit_code: code,
            stderr: output.stderr,
        }),
    }
}

/// Commits the index; hooks are skipped since the content is engine-generated
pub async fn commit(runner: &ProcessRunner, path: &Path, message: &str) -> FlowResult<()> {
    runner
        .git_checked(path, &["commit", "--no-verify", "-m", message])
        .await?;
    Ok(())
}

/// Upstream tracking ref of the current branch (e.g. `origin/main`), if any
pub async fn upstream_ref(runner: &ProcessRunner, path: &Path) -> FlowResult<Option<String>> {
    let output = runner.git(path, GIT_UPSTREAM_ARGS).await?;
    if output.success() && !output.stdout.is_empty() {
        Ok(Some(output.stdout))
    } else {
        Ok(None)
    }
}

pub async fn commit_message(runner: &ProcessRunner, path: &Path, rev: &str) -> FlowResult<String> {
    let output = runner
        .git_checked(path, &["log", "-1", "--format=%B", rev])
        .await?;
    Ok(output.stdout)
}

/// `git merge-base --is-ancestor ancestor descendant`
pub async fn is_ancestor(
    runner: &ProcessRunner,
    path: &Path,
    ancestor: &str,
    descendant: &str,
) -> FlowResult<bool> {
    let output = runner
        .git(path, &["merge-base", "--is-ancestor", ancestor, descendant])
        .await?;
    match output.exit_code {
        0 => Ok(true),
        1 => Ok(false),
        code => Err(FlowError::ProcessFailure {
            command: format!("git merge-base --is-ancestor {ancestor} {descendant}"),
            exit_code: code,
            stderr: output.stderr,
        }),
    }
}

pub async fn merge_ff_only(runner: &ProcessRunner, path: &Path, rev: &str) -> FlowResult<()> {
    runner.git_checked(path, &["merge", "--ff-only", rev]).await?;
    Ok(())
}

pub async fn remote_url(runner: &ProcessRunner, path: &Path) -> FlowResult<Option<String>> {
    let output = runner.git(path, GIT_REMOTE_URL_ARGS).await?;
    if output.success() && !output.stdout.is_empty() {
        Ok(Some(output.stdout))
    } else {
        Ok(None)
    }
}

/// Prefixes remote-facing arguments with the credential helper when needed
fn with_credentials<'a>(credentials: Option<&Credentials>, args: &[&'a str]) -> Vec<&'a str> {
    let mut full = Vec::with_capacity(args.len() + 4);
    if credentials.is_some() {
        full.extend(Credentials::git_config_args());
    }
    full.extend_from_slice(args);
    full
}

async fn remote_command(
    runner: &ProcessRunner,
    path: &Path,
    args: &[&str],
    credentials: Option<&Credentials>,
) -> FlowResult<()> {
    let full = with_credentials(credentials, args);
    match credentials {
        Some(creds) => {
            runner
                .git_checked_with_env(path, &full, &creds.env())
                .await?
        }
        None => runner.git_checked(path, &full).await?,
    };
    Ok(())
}

/// Fast-forward-only pull of the current branch
pub async fn pull_ff_only(
    runner: &ProcessRunner,
    path: &Path,
    credentials: Option<&Credentials>,
) -> FlowResult<()> {
    remote_command(runner, path, GIT_PULL_ARGS, credentials).await
}

pub async fn push(
    runner: &ProcessRunner,
    path: &Path,
    credentials: Option<&Credentials>,
) -> FlowResult<()> {
    remote_command(runner, path, GIT_PUSH_ARGS, credentials).await
}

/// Fetches and prunes deleted remote branches; never touches the working tree
pub async fn fetch_prune(
    runner: &ProcessRunner,
    path: &Path,
    credentials: Option<&Credentials>,
) -> FlowResult<()> {
    remote_command(runner, path, GIT_FETCH_PRUNE_ARGS, credentials).await
}

/// Registers `url` as a submodule at `dir` inside the working tree
pub async fn submodule_add(
    runner: &ProcessRunner,
    path: &Path,
    url: &str,
    dir: &str,
) -> FlowResult<()> {
    let mut args: Vec<&str> = Vec::new();
    if is_local_url(url) {
        // Local mirrors need the file transport, which git disables for submodules
        args.extend(["-c", "protocol.file.allow=always"]);
    }
    args.extend(["submodule", "add", url, dir]);
    runner.git_checked(path, &args).await?;
    Ok(())
}

/// Returns true when `dir` is recorded in the index as a submodule (gitlink)
pub async fn is_gitlink(runner: &ProcessRunner, path: &Path, dir: &str) -> FlowResult<bool> {
    let output = runner
        .git_checked(path, &["ls-files", "--stage", "--", dir])
        .await?;
    Ok(output
        .stdout
        .lines()
        .any(|line| line.starts_with(GITLINK_MODE)))
}

/// Checks out a submodule that is registered but not yet initialized
pub async fn submodule_update_init(
    runner: &ProcessRunner,
    path: &Path,
    url: &str,
    dir: &str,
) -> FlowResult<()> {
    let mut args: Vec<&str> = Vec::new();
    if is_local_url(url) {
        args.extend(["-c", "protocol.file.allow=always"]);
    }
    args.extend(["submodule", "update", "--init", "--", dir]);
    runner.git_checked(path, &args).await?;
    Ok(())
}

fn is_local_url(url: &str) -> bool {
    url.starts_with("file://") || !(url.contains("://") || url.contains('@'))
}

/// Appends `pattern` to the repository's `info/exclude` if not already listed
pub async fn exclude_locally(runner: &ProcessRunner, path: &Path, pattern: &str) -> FlowResult<()> {
    let output = runner.git_checked(path, GIT_EXCLUDE_PATH_ARGS).await?;
    let exclude_file = path.join(output.stdout.trim());

    let existing = match tokio::fs::read_to_string(&exclude_file).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(FlowError::io(&exclude_file, e)),
    };

    if existing.lines().any(|line| line.trim() == pattern) {
        return Ok(());
    }

    if let Some(parent) = exclude_file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FlowError::io(parent, e))?;
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(pattern);
    updated.push('\n');
    tokio::fs::write(&exclude_file, updated)
        .await
        .map_err(|e| FlowError::io(&exclude_file, e))?;
    debug!(repo = %path.display(), pattern, "added local exclude");
    Ok(())
}
