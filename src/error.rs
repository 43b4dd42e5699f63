//! Error kinds produced by the synchronization engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a single repository's workflow run.
///
/// Sibling repositories are never affected by these; the orchestrator records
/// them per repository and carries on.
#[derive(Debug, Error)]
pub enum FlowError {
    /// An external command exited with a non-zero status
    #[error("`{command}` exited with {exit_code}: {stderr}")]
    ProcessFailure {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// An external command did not finish within the configured bound
    #[error("`{command}` timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    /// The command could not be started at all
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The repository already holds stash entries we did not create
    #[error("conflicting stash: {count} existing stash entries, refusing to stash")]
    ConflictingStash { count: usize },

    /// The deterministic stash branch name is already taken
    #[error("stash branch '{branch}' already exists, inspect it before retrying")]
    StashBranchExists { branch: String },

    /// The local branch cannot be fast-forwarded to the fetched tip
    #[error("branch '{branch}' has diverged from its upstream")]
    DivergedBranch { branch: String },

    /// Something the workflow depends on is absent (repository, branch, upstream)
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    /// The pulled commit does not carry a sufficient merge authorization
    #[error("merge not authorized: {reason}")]
    UnauthorizedMerge { reason: String },

    /// Shutdown was requested before the workflow reached its next step
    #[error("cancelled at checkpoint")]
    Cancelled,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result alias.
pub type FlowResult<T> = std::result::Result<T, FlowError>;

impl FlowError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FlowError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short single-line description for report rendering
    pub fn step_summary(&self) -> String {
        match self {
            FlowError::ProcessFailure {
                command, stderr, ..
            } => {
                let first_line = stderr.lines().next().unwrap_or("").trim();
                if first_line.is_empty() {
                    format!("{command} failed")
                } else {
                    format!("{command}: {first_line}")
                }
            }
            FlowError::Timeout { secs, .. } => format!("timeout ({secs}s)"),
            FlowError::ConflictingStash { .. } => "conflicting stash".to_string(),
            FlowError::StashBranchExists { branch } => format!("{branch} already exists"),
            FlowError::DivergedBranch { .. } => "diverged".to_string(),
            other => other.to_string(),
        }
    }
}
