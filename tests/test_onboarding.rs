//! Integration tests for the Onboarding Workflow and onboarding sweeps

mod common;

use anyhow::Result;
use common::git::{branch_exists, create_test_commit, git, porcelain};
use common::{is_git_available, Workspace};
use niagara::core::{probe, read_marker, MarkerKind, ProgressBoard};
use niagara::flow::{onboard, OnboardOutcome, Orchestrator};
use niagara::git::{ProcessRunner, Status};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_onboarding_registers_commits_and_pushes() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let app = ws.add_repo("app")?;
    let ctx = ws.context();

    let outcome = onboard(&ctx, &app).await?;
    assert_eq!(
        outcome,
        OnboardOutcome::Onboarded {
            stash: None,
            committed: true
        }
    );

    // Component registered and propagated upstream
    assert!(app.join(".gitmodules").exists());
    assert!(app.join("niagara").join("index.js").exists());
    assert_eq!(ws.remote_subject("app")?, "added niagara sub module");

    // Child marker written but never shows up as a change
    let marker = read_marker(&app.join("waterfall.json"))?.expect("marker written");
    assert_eq!(marker.kind, MarkerKind::Child);
    assert_eq!(marker.repository_name.as_deref(), Some("app"));
    assert_eq!(marker.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(porcelain(&app)?, "");

    let runner = ProcessRunner::default();
    let probed = probe(&runner, &app, "waterfall.json", "niagara").await?;
    assert!(!probed.is_eligible());
    Ok(())
}

#[tokio::test]
async fn test_second_run_is_noop() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let app = ws.add_repo("app")?;
    let ctx = ws.context();

    onboard(&ctx, &app).await?;
    let head = git(&app, &["rev-parse", "HEAD"])?;
    let remote_head = git(&ws.remote("app"), &["rev-parse", "main"])?;

    assert_eq!(onboard(&ctx, &app).await?, OnboardOutcome::AlreadyOnboarded);
    assert_eq!(git(&app, &["rev-parse", "HEAD"])?, head);
    assert_eq!(git(&ws.remote("app"), &["rev-parse", "main"])?, remote_head);
    Ok(())
}

#[tokio::test]
async fn test_uncommitted_work_is_relocated_first() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let app = ws.add_repo("app")?;
    std::fs::write(app.join("README.md"), "# work in progress")?;
    std::fs::write(app.join("scratch.txt"), "scratch")?;
    let short = git(&app, &["rev-parse", "--short", "HEAD"])?;

    let outcome = onboard(&ws.context(), &app).await?;

    let stash_branch = format!("stash-main-{short}");
    match outcome {
        OnboardOutcome::Onboarded { stash: Some(op), .. } => {
            assert_eq!(op.stash_branch, stash_branch)
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(branch_exists(&app, &stash_branch));
    assert_eq!(
        git(&app, &["show", &format!("{stash_branch}:scratch.txt")])?,
        "scratch"
    );

    // The onboarding commit does not carry the relocated work
    assert_eq!(git(&app, &["show", "HEAD:README.md"])?, "# app");
    assert!(git(&app, &["show", "HEAD:scratch.txt"]).is_err());
    Ok(())
}

#[tokio::test]
async fn test_failed_pull_registers_nothing() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let app = ws.add_repo("app")?;
    ws.push_upstream_commit("app", "remote.txt", "remote", "Remote change")?;
    create_test_commit(&app, "local.txt", "local", "Local change")?;
    let head = git(&app, &["rev-parse", "HEAD"])?;

    let failure = onboard(&ws.context(), &app).await.unwrap_err();

    assert_eq!(failure.step, "pull");
    assert!(!app.join(".gitmodules").exists());
    assert!(!app.join("waterfall.json").exists());
    assert_eq!(git(&app, &["rev-parse", "HEAD"])?, head);
    assert_eq!(ws.remote_subject("app")?, "Remote change");
    Ok(())
}

#[tokio::test]
async fn test_sweep_reports_each_repository_independently() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let good = ws.add_repo("good")?;
    let diverged = ws.add_repo("diverged")?;
    let library = ws.add_repo("ui-library")?;
    std::fs::create_dir(ws.family().join("plain"))?;

    ws.push_upstream_commit("diverged", "remote.txt", "remote", "Remote change")?;
    create_test_commit(&diverged, "local.txt", "local", "Local change")?;

    let orchestrator = Orchestrator::new(ws.context(), ws.family(), 4)?;
    let report = orchestrator
        .onboarding_sweep(false, &ProgressBoard::hidden())
        .await?;

    let entries = report.entries();
    let status_of = |name: &str| {
        entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.status)
    };
    assert_eq!(status_of("good"), Some(Status::Onboarded));
    assert_eq!(status_of("diverged"), Some(Status::Failed));
    assert_eq!(status_of("plain"), Some(Status::Skipped));
    assert_eq!(status_of("ui-library"), None);
    assert_eq!(status_of("niagara"), None);

    let failed = entries.iter().find(|e| e.name == "diverged").unwrap();
    assert_eq!(failed.step.as_deref(), Some("pull"));

    assert_eq!(report.succeeded.load(Ordering::Relaxed), 1);
    assert_eq!(report.failed.load(Ordering::Relaxed), 1);
    assert!(good.join("waterfall.json").exists());
    assert!(!library.join("waterfall.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_dry_run_changes_nothing() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let app = ws.add_repo("app")?;
    let head = git(&app, &["rev-parse", "HEAD"])?;

    let orchestrator = Orchestrator::new(ws.context(), ws.family(), 2)?;
    let report = orchestrator
        .onboarding_sweep(true, &ProgressBoard::hidden())
        .await?;

    let entries = report.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, Status::Eligible);
    assert_eq!(git(&app, &["rev-parse", "HEAD"])?, head);
    assert!(!app.join(".gitmodules").exists());
    Ok(())
}

#[tokio::test]
async fn test_boot_refreshes_root_and_child_markers() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let app = ws.add_repo("app")?;
    onboard(&ws.context(), &app).await?;

    // Simulate a marker written by an older engine, with a foreign key
    std::fs::write(
        app.join("waterfall.json"),
        "{\"version\": \"0.0.1\", \"type\": \"child\", \"repositoryName\": \"app\", \"flowing\": true}",
    )?;

    let versions = [("git".to_string(), "git version 2.99.0".to_string())]
        .into_iter()
        .collect();
    let ctx = ws.context().with_tool_versions(versions);
    let orchestrator = Orchestrator::new(ctx, ws.family(), 2)?;
    orchestrator.refresh_markers().await?;

    let root = read_marker(&ws.engine_dir().join("waterfall.json"))?.expect("root marker");
    assert_eq!(root.kind, MarkerKind::Root);
    assert_eq!(root.dependency_version("git"), Some("git version 2.99.0"));

    let child = read_marker(&app.join("waterfall.json"))?.expect("child marker");
    assert_eq!(child.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(child.dependency_version("git"), Some("git version 2.99.0"));
    assert_eq!(child.extra.get("flowing"), Some(&serde_json::Value::Bool(true)));
    Ok(())
}

#[tokio::test]
async fn test_fresh_clone_of_onboarded_remote_initializes_component() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let app = ws.add_repo("app")?;
    onboard(&ws.context(), &app).await?;
    let remote_head = git(&ws.remote("app"), &["rev-parse", "main"])?;

    // A second machine: registered upstream, but no marker and no checkout
    let app = ws.reclone("app")?;
    let runner = ProcessRunner::default();
    let probed = probe(&runner, &app, "waterfall.json", "niagara").await?;
    assert!(!probed.has_marker);
    assert!(!probed.has_nested_reference);

    let ctx = ws.context();
    assert_eq!(
        onboard(&ctx, &app).await?,
        OnboardOutcome::Onboarded {
            stash: None,
            committed: false
        }
    );
    assert!(app.join("niagara").join("index.js").exists());
    assert!(app.join("waterfall.json").exists());
    assert_eq!(porcelain(&app)?, "");
    assert_eq!(git(&ws.remote("app"), &["rev-parse", "main"])?, remote_head);

    assert_eq!(onboard(&ctx, &app).await?, OnboardOutcome::AlreadyOnboarded);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_push_reports_relocated_work() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let app = ws.add_repo("app")?;
    ws.reject_pushes("app")?;
    std::fs::write(app.join("README.md"), "# unsaved edit")?;
    let stash_branch = format!("stash-main-{}", git(&app, &["rev-parse", "--short", "HEAD"])?);

    let failure = onboard(&ws.context(), &app).await.unwrap_err();

    assert_eq!(failure.step, "push");
    assert_eq!(failure.recovery_branch.as_deref(), Some(stash_branch.as_str()));
    assert!(failure.reason().contains(&stash_branch));
    assert!(branch_exists(&app, &stash_branch));
    assert_eq!(
        git(&app, &["show", &format!("{stash_branch}:README.md")])?,
        "# unsaved edit"
    );
    assert!(!app.join("waterfall.json").exists());
    assert_eq!(ws.remote_subject("app")?, "Initial commit");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_runs_on_one_repository_relocate_once() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let ws = Workspace::new()?;
    let app = ws.add_repo("app")?;
    std::fs::write(app.join("README.md"), "# work in progress")?;

    // Both runs share one context and so one set of repository locks
    let ctx = ws.context();
    let (first, second) = tokio::join!(onboard(&ctx, &app), onboard(&ctx, &app));
    let mut outcomes = vec![first?, second?];
    outcomes.sort_by_key(|o| matches!(o, OnboardOutcome::AlreadyOnboarded));

    assert!(matches!(
        &outcomes[0],
        OnboardOutcome::Onboarded { stash: Some(_), .. }
    ));
    assert_eq!(outcomes[1], OnboardOutcome::AlreadyOnboarded);
    assert_eq!(git(&app, &["branch", "--list", "stash-*"])?.lines().count(), 1);
    Ok(())
}
