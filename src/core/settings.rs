//! Engine settings and the externally supplied configuration records
//!
//! Three sources feed the engine:
//! - `niagara.toml`: engine settings (layout, schedule, limits)
//! - `spring.json`: ordered repository credential records
//! - `river.json`: per-repository sync configuration, including merge policy

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::config::{
    APP_CONFIG_DIR, COMMAND_TIMEOUT_SECS, DEFAULT_EXCLUSION_PATTERN, DEFAULT_PROBED_TOOLS,
    DEFAULT_SYNC_INTERVAL_SECS, MARKER_FILE_NAME, RIVER_FILE_NAME, SETTINGS_FILE_NAME,
    SHARED_COMPONENT_DIR, SHARED_COMPONENT_URL, SPRING_FILE_NAME,
};
use crate::error::{FlowError, FlowResult};
use crate::flow::gate::SyncPolicy;
use crate::git::{CredentialStore, Credentials, Secret};

/// Engine settings loaded from `niagara.toml`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory whose children are the sibling repositories
    pub parent_directory: Option<PathBuf>,
    pub exclusion_pattern: String,
    pub marker_file: String,
    pub component_dir: String,
    pub component_url: String,
    pub sync_interval_secs: u64,
    pub command_timeout_secs: u64,
    pub jobs: Option<usize>,
    pub tools: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            parent_directory: None,
            exclusion_pattern: DEFAULT_EXCLUSION_PATTERN.to_string(),
            marker_file: MARKER_FILE_NAME.to_string(),
            component_dir: SHARED_COMPONENT_DIR.to_string(),
            component_url: SHARED_COMPONENT_URL.to_string(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            command_timeout_secs: COMMAND_TIMEOUT_SECS,
            jobs: None,
            tools: DEFAULT_PROBED_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl EngineSettings {
    /// Loads settings from the first existing candidate, else defaults.
    ///
    /// An explicit path must exist; implicit candidates are optional.
    pub fn load(explicit: Option<&Path>, engine_dir: &Path) -> FlowResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let mut candidates = vec![engine_dir.join(SETTINGS_FILE_NAME)];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(APP_CONFIG_DIR).join(SETTINGS_FILE_NAME));
        }

        for candidate in candidates {
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        debug!("no settings file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> FlowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FlowError::io(path, e))?;
        Self::parse(&content)
            .map_err(|e| FlowError::Config(format!("{}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Parent directory to scan: explicit setting, else the engine dir's parent
    pub fn resolve_parent(&self, engine_dir: &Path) -> FlowResult<PathBuf> {
        if let Some(parent) = &self.parent_directory {
            return Ok(parent.clone());
        }
        engine_dir.parent().map(Path::to_path_buf).ok_or_else(|| {
            FlowError::MissingPrerequisite(format!(
                "{} has no parent directory",
                engine_dir.display()
            ))
        })
    }
}

/// One record of the global configuration list
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpringEntry {
    pub repository: String,
    pub username: String,
    pub password: Secret,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub option: Option<serde_json::Value>,
}

/// Credential store backed by `spring.json`
#[derive(Debug, Clone, Default)]
pub struct SpringStore {
    entries: Vec<SpringEntry>,
}

impl SpringStore {
    pub fn new(entries: Vec<SpringEntry>) -> Self {
        Self { entries }
    }

    /// Reads `spring.json` from `engine_dir`; a missing file yields an empty store
    pub fn load(engine_dir: &Path) -> FlowResult<Self> {
        let path = engine_dir.join(SPRING_FILE_NAME);
        match read_optional(&path)? {
            Some(content) => Self::parse(&content)
                .map_err(|e| FlowError::Config(format!("{}: {e}", path.display()))),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Vec<SpringEntry>>(content).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialStore for SpringStore {
    fn credentials_for(&self, repository: &str) -> Option<Credentials> {
        self.entries
            .iter()
            .find(|entry| entry.repository == repository)
            .map(|entry| Credentials::new(entry.username.clone(), entry.password.clone()))
    }
}

/// Deployment record of `river.json`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DeployConfig {
    #[serde(rename = "type")]
    pub kind: DeployKind,
    pub branch: String,
    pub url: Option<String>,
    #[serde(default = "default_true")]
    pub test: bool,
    #[serde(default)]
    pub documentation: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeployKind {
    Production,
    Development,
}

fn default_true() -> bool {
    true
}

/// Per-repository sync configuration (`river.json`)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RiverConfig {
    #[serde(default)]
    pub test: Vec<String>,
    #[serde(default)]
    pub deploy: Option<DeployConfig>,
    #[serde(default)]
    pub policy: Option<SyncPolicy>,
}

impl RiverConfig {
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        // An empty file means "base control flow"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(content)
    }

    pub fn load(path: &Path) -> FlowResult<Option<Self>> {
        match read_optional(path)? {
            Some(content) => Self::parse(&content)
                .map(Some)
                .map_err(|e| FlowError::Config(format!("{}: {e}", path.display()))),
            None => Ok(None),
        }
    }

    /// Repository-local `river.json` wins over the engine-wide one
    pub fn resolve(engine_dir: &Path, repository: &Path) -> FlowResult<Self> {
        if let Some(local) = Self::load(&repository.join(RIVER_FILE_NAME))? {
            return Ok(local);
        }
        Ok(Self::load(&engine_dir.join(RIVER_FILE_NAME))?.unwrap_or_default())
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.policy.clone().unwrap_or_default()
    }
}

fn read_optional(path: &Path) -> FlowResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FlowError::io(path, e)),
    }
}
