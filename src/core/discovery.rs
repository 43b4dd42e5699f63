//! Sibling repository discovery
//!
//! Siblings are the immediate child directories of the parent directory that
//! the engine is installed in. Each candidate is probed and classified as
//! eligible for onboarding or already onboarded.

use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::probe::{probe, ProbeResult};
use super::settings::EngineSettings;
use crate::error::{FlowError, FlowResult};
use crate::git::ProcessRunner;

/// A sibling directory together with its probe result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedRepository {
    pub path: PathBuf,
    pub probe: ProbeResult,
}

impl ProbedRepository {
    pub fn name(&self) -> String {
        repo_name(&self.path)
    }
}

/// Directory name used for display and credential lookup
pub fn repo_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

pub struct SiblingDiscovery {
    runner: ProcessRunner,
    exclusion: Regex,
    marker_file: String,
    component_dir: String,
    concurrency: usize,
}

impl SiblingDiscovery {
    pub fn new(runner: ProcessRunner, settings: &EngineSettings, concurrency: usize) -> FlowResult<Self> {
        let exclusion = Regex::new(&settings.exclusion_pattern).map_err(|e| {
            FlowError::Config(format!(
                "invalid exclusion pattern '{}': {e}",
                settings.exclusion_pattern
            ))
        })?;
        Ok(Self {
            runner,
            exclusion,
            marker_file: settings.marker_file.clone(),
            component_dir: settings.component_dir.clone(),
            concurrency: concurrency.max(1),
        })
    }

    /// Immediate child directories whose names do not match the exclusion pattern
    pub fn candidates(&self, parent: &Path) -> FlowResult<Vec<PathBuf>> {
        let parent = parent
            .canonicalize()
            .map_err(|e| FlowError::io(parent, e))?;
        let entries = std::fs::read_dir(&parent).map_err(|e| FlowError::io(&parent, e))?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FlowError::io(&parent, e))?;
            let path = entry.path();
            // Follows symlinks, matching how the directory would be used
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if self.exclusion.is_match(&name) {
                debug!(dir = %name, "excluded by pattern");
                continue;
            }
            candidates.push(path);
        }
        Ok(candidates)
    }

    /// Probes every candidate concurrently
    pub async fn scan(&self, parent: &Path) -> FlowResult<Vec<ProbedRepository>> {
        let candidates = self.candidates(parent)?;
        info!(parent = %parent.display(), count = candidates.len(), "probing siblings");

        stream::iter(candidates)
            .map(|path| async move {
                let result = probe(&self.runner, &path, &self.marker_file, &self.component_dir).await?;
                debug!(repo = %path.display(), ?result, "probed");
                Ok::<_, FlowError>(ProbedRepository { path, probe: result })
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await
    }

    /// Siblings that still need onboarding
    pub async fn discover(&self, parent: &Path) -> FlowResult<Vec<PathBuf>> {
        Ok(self
            .scan(parent)
            .await?
            .into_iter()
            .filter(|repo| repo.probe.is_eligible())
            .map(|repo| repo.path)
            .collect())
    }

    /// Siblings that are fully onboarded and therefore synced each tick
    pub async fn onboarded(&self, parent: &Path) -> FlowResult<Vec<PathBuf>> {
        Ok(self
            .scan(parent)
            .await?
            .into_iter()
            .filter(|repo| !repo.probe.is_eligible())
            .map(|repo| repo.path)
            .collect())
    }
}
