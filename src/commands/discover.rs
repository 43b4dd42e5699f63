//! `niagara discover`: lists siblings and their onboarding state

use anyhow::{Context, Result};
use serde::Serialize;

use super::{build_engine, engine_dir, GlobalOptions};
use crate::core::{ProbeResult, Shutdown, NO_REPOS_MESSAGE, PATH_DISPLAY_WIDTH};
use crate::utils::shorten_path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoveredRepository {
    name: String,
    path: String,
    eligible: bool,
    #[serde(flatten)]
    probe: ProbeResult,
}

pub async fn handle_discover_command(options: &GlobalOptions) -> Result<()> {
    let engine_dir = engine_dir()?;
    let engine = build_engine(options, &engine_dir, Shutdown::never(), false).await?;
    let orchestrator = &engine.orchestrator;

    let mut repos: Vec<DiscoveredRepository> = orchestrator
        .discovery()
        .scan(orchestrator.parent())
        .await
        .context("Failed to scan sibling repositories")?
        .into_iter()
        .map(|repo| DiscoveredRepository {
            name: repo.name(),
            path: repo.path.display().to_string(),
            eligible: repo.probe.is_eligible(),
            probe: repo.probe,
        })
        .collect();
    repos.sort_by(|a, b| a.name.cmp(&b.name));

    if options.json {
        println!("{}", serde_json::to_string_pretty(&repos)?);
        return Ok(());
    }

    if repos.is_empty() {
        println!("{NO_REPOS_MESSAGE}");
        return Ok(());
    }

    let width = repos.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for repo in &repos {
        let (symbol, state) = if repo.eligible {
            ("🟡", "needs onboarding")
        } else {
            ("🟢", "onboarded")
        };
        println!(
            "{} {:width$} {:30} {}",
            symbol,
            repo.name,
            shorten_path(&repo.path, PATH_DISPLAY_WIDTH),
            state,
            width = width
        );
    }
    Ok(())
}
