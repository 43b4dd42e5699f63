//! Version probing for the external tools recorded in markers

use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::git::ProcessRunner;

/// Runs `<tool> --version` for each tool concurrently.
///
/// Tools that are missing or exit non-zero are left out of the result.
pub async fn probe_tool_versions(
    runner: &ProcessRunner,
    tools: &[String],
    dir: &Path,
) -> BTreeMap<String, String> {
    let probes = tools.iter().map(|tool| async move {
        match runner.run(tool, &["--version"], dir).await {
            Ok(output) if output.success() => {
                first_line(&output.stdout).map(|version| (tool.clone(), version))
            }
            Ok(output) => {
                debug!(tool = %tool, exit_code = output.exit_code, "version probe failed");
                None
            }
            Err(e) => {
                debug!(tool = %tool, error = %e, "tool unavailable");
                None
            }
        }
    });

    join_all(probes).await.into_iter().flatten().collect()
}

fn first_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
