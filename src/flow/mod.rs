//! Per-repository workflows and the orchestrator driving them
//!
//! Every workflow takes the repository's execution lock for its whole run,
//! executes its steps strictly in order and reports the step that failed.

pub mod gate;
pub mod onboard;
pub mod orchestrator;
pub mod stash;
pub mod sync;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::core::{EngineSettings, RepoLocks, Shutdown};
use crate::error::FlowError;
use crate::git::{CredentialStore, Credentials, ProcessRunner};

pub use gate::{authorize, explain, Directives, MergeVerdict, SyncPolicy};
pub use onboard::{onboard, OnboardOutcome};
pub use orchestrator::Orchestrator;
pub use stash::{safe_stash, StashOperation, StashStep};
pub use sync::{sync_repository, try_sync, SyncOutcome};

/// A workflow aborted at `step`
#[derive(Debug, Error)]
#[error("{step}: {source}")]
pub struct StepFailure {
    pub step: &'static str,
    #[source]
    pub source: FlowError,
    /// Branch holding relocated work when the failure happened after it was created
    pub recovery_branch: Option<String>,
}

impl StepFailure {
    pub fn new(step: &'static str, source: FlowError) -> Self {
        Self {
            step,
            source,
            recovery_branch: None,
        }
    }

    pub fn with_recovery(mut self, branch: impl Into<String>) -> Self {
        self.recovery_branch = Some(branch.into());
        self
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, FlowError::Cancelled)
    }

    /// One-line reason for reports
    pub fn reason(&self) -> String {
        match &self.recovery_branch {
            Some(branch) => format!("{} (work preserved on {branch})", self.source.step_summary()),
            None => self.source.step_summary(),
        }
    }
}

/// Tags a step's error with the step name
pub(crate) trait StepContext<T> {
    fn at(self, step: &'static str) -> Result<T, StepFailure>;
}

impl<T> StepContext<T> for Result<T, FlowError> {
    fn at(self, step: &'static str) -> Result<T, StepFailure> {
        self.map_err(|source| StepFailure::new(step, source))
    }
}

/// Shared state every workflow runs against
#[derive(Clone)]
pub struct FlowContext {
    pub runner: ProcessRunner,
    pub settings: Arc<EngineSettings>,
    pub locks: RepoLocks,
    pub credentials: Arc<dyn CredentialStore>,
    pub shutdown: Shutdown,
    /// Directory the engine runs from; holds the engine-wide river config
    pub engine_dir: PathBuf,
    /// Engine version written into markers
    pub version: String,
    /// Tool versions probed at boot
    pub tool_versions: Arc<BTreeMap<String, String>>,
}

impl FlowContext {
    pub fn new(
        runner: ProcessRunner,
        settings: EngineSettings,
        credentials: Arc<dyn CredentialStore>,
        engine_dir: PathBuf,
    ) -> Self {
        Self {
            runner,
            settings: Arc::new(settings),
            locks: RepoLocks::new(),
            credentials,
            shutdown: Shutdown::never(),
            engine_dir,
            version: env!("CARGO_PKG_VERSION").to_string(),
            tool_versions: Arc::new(BTreeMap::new()),
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_tool_versions(mut self, versions: BTreeMap<String, String>) -> Self {
        self.tool_versions = Arc::new(versions);
        self
    }

    /// Credentials for a repository, keyed by its directory name
    pub(crate) fn credentials_for(&self, path: &std::path::Path) -> Option<Credentials> {
        self.credentials
            .credentials_for(&crate::core::repo_name(path))
    }

    pub(crate) fn checkpoint(&self, step: &'static str) -> Result<(), StepFailure> {
        self.shutdown.checkpoint().at(step)
    }
}

impl std::fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowContext")
            .field("engine_dir", &self.engine_dir)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
