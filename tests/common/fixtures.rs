//! Test fixtures and builders
//!
//! A `Workspace` mirrors a real installation:
//!
//! ```text
//! <tmp>/remotes/<name>.git     bare "remote" for every repository
//! <tmp>/remotes/<name>-work    scratch clone used to publish upstream commits
//! <tmp>/family/niagara         engine directory (excluded from discovery)
//! <tmp>/family/<name>          sibling clones
//! ```

use anyhow::Result;
use niagara::core::EngineSettings;
use niagara::flow::FlowContext;
use niagara::git::{NoCredentials, ProcessRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::git::{configure_user, create_test_commit, git, setup_bare_repo, setup_git_repo};

pub const COMPONENT: &str = "component";

pub struct Workspace {
    pub temp_dir: TempDir,
}

impl Workspace {
    /// Creates the layout plus a published shared component
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let workspace = Self { temp_dir };
        std::fs::create_dir_all(workspace.engine_dir())?;
        std::fs::create_dir_all(workspace.remotes())?;
        workspace.publish(COMPONENT, "index.js", "module.exports = {};")?;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn family(&self) -> PathBuf {
        self.root().join("family")
    }

    pub fn engine_dir(&self) -> PathBuf {
        self.family().join("niagara")
    }

    pub fn remotes(&self) -> PathBuf {
        self.root().join("remotes")
    }

    pub fn remote(&self, name: &str) -> PathBuf {
        self.remotes().join(format!("{name}.git"))
    }

    fn work_clone(&self, name: &str) -> PathBuf {
        self.remotes().join(format!("{name}-work"))
    }

    pub fn repo(&self, name: &str) -> PathBuf {
        self.family().join(name)
    }

    pub fn component_url(&self) -> String {
        self.remote(COMPONENT).display().to_string()
    }

    /// Bare remote with one commit on `main`
    fn publish(&self, name: &str, file: &str, content: &str) -> Result<()> {
        let remote = self.remote(name);
        setup_bare_repo(&remote)?;

        let work = self.work_clone(name);
        std::fs::create_dir_all(&work)?;
        setup_git_repo(&work)?;
        create_test_commit(&work, file, content, "Initial commit")?;
        git(&work, &["remote", "add", "origin", &remote.display().to_string()])?;
        git(&work, &["push", "--quiet", "-u", "origin", "main"])?;
        Ok(())
    }

    /// Publishes a remote and clones it into the family directory
    pub fn add_repo(&self, name: &str) -> Result<PathBuf> {
        self.publish(name, "README.md", &format!("# {name}"))?;
        let path = self.repo(name);
        git(
            &self.family(),
            &[
                "clone",
                "--quiet",
                &self.remote(name).display().to_string(),
                name,
            ],
        )?;
        configure_user(&path)?;
        Ok(path)
    }

    /// Pushes a commit to `name`'s remote from the scratch clone
    pub fn push_upstream_commit(
        &self,
        name: &str,
        file: &str,
        content: &str,
        message: &str,
    ) -> Result<String> {
        let work = self.work_clone(name);
        git(&work, &["pull", "--quiet", "--ff-only"])?;
        create_test_commit(&work, file, content, message)?;
        git(&work, &["push", "--quiet", "origin", "main"])?;
        git(&work, &["rev-parse", "HEAD"])
    }

    /// Replaces the sibling clone of `name` with a fresh clone of its remote
    pub fn reclone(&self, name: &str) -> Result<PathBuf> {
        let path = self.repo(name);
        std::fs::remove_dir_all(&path)?;
        git(
            &self.family(),
            &[
                "clone",
                "--quiet",
                &self.remote(name).display().to_string(),
                name,
            ],
        )?;
        configure_user(&path)?;
        Ok(path)
    }

    /// Installs a `pre-receive` hook on `name`'s remote that refuses every push
    #[cfg(unix)]
    pub fn reject_pushes(&self, name: &str) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let hook = self.remote(name).join("hooks").join("pre-receive");
        std::fs::create_dir_all(hook.parent().expect("hooks directory"))?;
        std::fs::write(&hook, "#!/bin/sh\necho 'pushes are frozen' >&2\nexit 1\n")?;
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    /// Latest commit subject on the remote's `main`
    pub fn remote_subject(&self, name: &str) -> Result<String> {
        git(&self.remote(name), &["log", "-1", "--format=%s", "main"])
    }

    /// Writes the engine-wide merge policy
    pub fn write_policy(&self, required_priority: i64, tokens: &[&str]) -> Result<()> {
        let tokens: Vec<String> = tokens.iter().map(|t| format!("\"{t}\"")).collect();
        std::fs::write(
            self.engine_dir().join("river.json"),
            format!(
                "{{\"policy\": {{\"requiredPriority\": {required_priority}, \"tokens\": [{}]}}}}",
                tokens.join(", ")
            ),
        )?;
        Ok(())
    }

    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            parent_directory: Some(self.family()),
            component_url: self.component_url(),
            command_timeout_secs: 60,
            tools: vec!["git".to_string()],
            ..EngineSettings::default()
        }
    }

    pub fn context(&self) -> FlowContext {
        FlowContext::new(
            ProcessRunner::default(),
            self.settings(),
            Arc::new(NoCredentials),
            self.engine_dir(),
        )
    }
}

/// Builder for standalone repositories without a remote
pub struct TestRepoBuilder {
    name: String,
    with_commits: usize,
    with_untracked: Vec<(String, String)>,
    with_modified: Vec<(String, String)>,
}

pub struct TestRepo {
    pub temp_dir: TempDir,
    pub name: String,
}

impl TestRepo {
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join(&self.name)
    }
}

impl TestRepoBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            with_commits: 1,
            with_untracked: Vec::new(),
            with_modified: Vec::new(),
        }
    }

    pub fn with_commits(mut self, count: usize) -> Self {
        self.with_commits = count.max(1);
        self
    }

    /// Leaves an untracked file in the working tree
    pub fn with_untracked(mut self, file: &str, content: &str) -> Self {
        self.with_untracked.push((file.to_string(), content.to_string()));
        self
    }

    /// Commits `file`, then leaves it modified with `content`
    pub fn with_modified(mut self, file: &str, content: &str) -> Self {
        self.with_modified.push((file.to_string(), content.to_string()));
        self
    }

    pub fn build(self) -> Result<TestRepo> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join(&self.name);
        std::fs::create_dir(&path)?;
        setup_git_repo(&path)?;

        create_test_commit(&path, "README.md", "# Test Repo", "Initial commit")?;
        for i in 1..self.with_commits {
            create_test_commit(
                &path,
                &format!("file{i}.txt"),
                &format!("content {i}"),
                &format!("Commit {i}"),
            )?;
        }

        for (file, content) in &self.with_modified {
            create_test_commit(&path, file, "original", &format!("Add {file}"))?;
            std::fs::write(path.join(file), content)?;
        }
        for (file, content) in &self.with_untracked {
            std::fs::write(path.join(file), content)?;
        }

        Ok(TestRepo {
            temp_dir,
            name: self.name,
        })
    }
}
