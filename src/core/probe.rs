//! Repository prober: decides whether a sibling still needs onboarding

use serde::Serialize;
use std::path::Path;

use crate::error::FlowResult;
use crate::git::operations::is_work_tree_root;
use crate::git::ProcessRunner;

/// Result of the three onboarding checks for one repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub has_marker: bool,
    pub is_version_controlled: bool,
    pub has_nested_reference: bool,
}

impl ProbeResult {
    /// Eligible unless all three checks pass
    pub fn is_eligible(&self) -> bool {
        !(self.has_marker && self.is_version_controlled && self.has_nested_reference)
    }
}

/// Runs the marker, repository and nested-reference checks concurrently.
///
/// "Not a repository" is a normal `false`; only unexpected I/O surfaces as an error.
pub async fn probe(
    runner: &ProcessRunner,
    path: &Path,
    marker_file: &str,
    component_dir: &str,
) -> FlowResult<ProbeResult> {
    let marker_path = path.join(marker_file);
    let nested_path = path.join(component_dir);

    let (has_marker, is_version_controlled, has_nested_reference) = tokio::join!(
        tokio::fs::try_exists(&marker_path),
        is_work_tree_root(runner, path),
        is_work_tree_root(runner, &nested_path),
    );

    Ok(ProbeResult {
        has_marker: has_marker.map_err(|e| crate::error::FlowError::io(&marker_path, e))?,
        is_version_controlled: is_version_controlled?,
        has_nested_reference: has_nested_reference?,
    })
}
