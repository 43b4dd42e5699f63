//! Integration tests for the Safe-Stash Workflow

mod common;

use anyhow::Result;
use common::fixtures::TestRepoBuilder;
use common::git::{branch_exists, create_test_commit, current_branch, git, porcelain};
use common::is_git_available;
use niagara::error::FlowError;
use niagara::flow::safe_stash;
use niagara::git::ProcessRunner;

fn expected_stash_branch(path: &std::path::Path) -> Result<String> {
    let short = git(path, &["rev-parse", "--short", "HEAD"])?;
    Ok(format!("stash-main-{short}"))
}

#[tokio::test]
async fn test_clean_repository_is_noop() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let repo = TestRepoBuilder::new("clean").with_commits(2).build()?;
    let path = repo.path();
    let branches_before = git(&path, &["branch", "--list"])?;

    let runner = ProcessRunner::default();
    assert!(safe_stash(&runner, &path).await?.is_none());
    assert!(safe_stash(&runner, &path).await?.is_none());

    assert_eq!(git(&path, &["branch", "--list"])?, branches_before);
    assert_eq!(git(&path, &["stash", "list"])?, "");
    Ok(())
}

#[tokio::test]
async fn test_uncommitted_work_moves_to_stash_branch() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let repo = TestRepoBuilder::new("dirty")
        .with_modified("tracked.txt", "local edit")
        .with_untracked("notes.md", "draft notes")
        .build()?;
    let path = repo.path();
    let expected = expected_stash_branch(&path)?;
    let head_before = git(&path, &["rev-parse", "HEAD"])?;

    let runner = ProcessRunner::default();
    let operation = safe_stash(&runner, &path)
        .await?
        .expect("dirty tree should be relocated");

    assert_eq!(operation.original_branch, "main");
    assert_eq!(operation.stash_branch, expected);

    // Original branch restored, clean, unmoved
    assert_eq!(current_branch(&path)?, "main");
    assert_eq!(porcelain(&path)?, "");
    assert_eq!(git(&path, &["rev-parse", "HEAD"])?, head_before);
    assert!(!path.join("notes.md").exists());
    assert_eq!(git(&path, &["stash", "list"])?, "");

    // The work is a single commit on top of the original head
    assert!(branch_exists(&path, &expected));
    let parent = git(&path, &["rev-parse", &format!("{expected}^")])?;
    assert_eq!(parent, head_before);
    assert_eq!(
        git(&path, &["log", "-1", "--format=%s", &expected])?,
        "stash commit on main"
    );
    assert_eq!(
        git(&path, &["show", &format!("{expected}:tracked.txt")])?,
        "local edit"
    );
    assert_eq!(
        git(&path, &["show", &format!("{expected}:notes.md")])?,
        "draft notes"
    );

    // Nothing left to relocate
    assert!(safe_stash(&runner, &path).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_existing_stash_aborts_before_touching_tree() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let repo = TestRepoBuilder::new("stashed")
        .with_modified("tracked.txt", "older work")
        .build()?;
    let path = repo.path();
    git(&path, &["stash", "push", "-m", "someone else's stash"])?;
    std::fs::write(path.join("tracked.txt"), "newer work")?;

    let runner = ProcessRunner::default();
    let failure = safe_stash(&runner, &path).await.unwrap_err();

    assert_eq!(failure.step, "check-pending-stash");
    assert!(matches!(failure.source, FlowError::ConflictingStash { count: 1 }));
    assert!(failure.recovery_branch.is_none());

    // Both the foreign stash and the new edit are untouched
    assert_eq!(std::fs::read_to_string(path.join("tracked.txt"))?, "newer work");
    assert!(git(&path, &["stash", "list"])?.contains("someone else's stash"));
    Ok(())
}

#[tokio::test]
async fn test_existing_stash_branch_is_hard_error() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let repo = TestRepoBuilder::new("collision")
        .with_untracked("draft.txt", "draft")
        .build()?;
    let path = repo.path();
    let expected = expected_stash_branch(&path)?;
    git(&path, &["branch", &expected])?;

    let runner = ProcessRunner::default();
    let failure = safe_stash(&runner, &path).await.unwrap_err();

    assert_eq!(failure.step, "check-pending-stash");
    match &failure.source {
        FlowError::StashBranchExists { branch } => assert_eq!(branch, &expected),
        other => panic!("unexpected error: {other}"),
    }
    assert!(path.join("draft.txt").exists());
    assert_eq!(git(&path, &["stash", "list"])?, "");
    Ok(())
}

#[tokio::test]
async fn test_feature_branch_name_is_sanitized() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let repo = TestRepoBuilder::new("feature").build()?;
    let path = repo.path();
    git(&path, &["checkout", "--quiet", "-b", "feature/login"])?;
    create_test_commit(&path, "login.rs", "fn login() {}", "Add login")?;
    std::fs::write(path.join("login.rs"), "fn login() { todo() }")?;

    let runner = ProcessRunner::default();
    let operation = safe_stash(&runner, &path).await?.unwrap();

    let short = git(&path, &["rev-parse", "--short", "HEAD"])?;
    assert_eq!(operation.stash_branch, format!("stash-feature-login-{short}"));
    assert_eq!(current_branch(&path)?, "feature/login");
    assert_eq!(porcelain(&path)?, "");
    Ok(())
}

#[tokio::test]
async fn test_detached_head_is_refused() -> Result<()> {
    if !is_git_available() {
        eprintln!("Git not available, skipping test");
        return Ok(());
    }

    let repo = TestRepoBuilder::new("detached").with_commits(2).build()?;
    let path = repo.path();
    git(&path, &["checkout", "--quiet", "--detach", "HEAD~1"])?;
    std::fs::write(path.join("README.md"), "edited while detached")?;

    let runner = ProcessRunner::default();
    let failure = safe_stash(&runner, &path).await.unwrap_err();

    assert_eq!(failure.step, "check-pending-stash");
    assert!(matches!(failure.source, FlowError::MissingPrerequisite(_)));
    assert_eq!(
        std::fs::read_to_string(path.join("README.md"))?,
        "edited while detached"
    );
    Ok(())
}
