//! Public API for the core module.
//!
//! This module provides the stable public API for core functionality including:
//! - Repository probing and sibling discovery
//! - Configuration records and engine constants
//! - Onboarding markers and tool version probing
//! - Execution locks, shutdown signalling and status reports
//!
//! Internal implementation details are not exposed through this API.

// Probing and discovery
pub use super::discovery::{repo_name, ProbedRepository, SiblingDiscovery};
pub use super::probe::{probe, ProbeResult};

// Configuration
pub use super::config::{get_git_concurrency, GIT_CONCURRENT_CAP};
pub use super::config::{
    CONCURRENCY_ENV_VAR, DEFAULT_REQUIRED_PRIORITY, MARKER_FILE_NAME, RIVER_FILE_NAME,
    SHARED_COMPONENT_DIR, SPRING_FILE_NAME,
};
pub use super::settings::{
    DeployConfig, DeployKind, EngineSettings, RiverConfig, SpringEntry, SpringStore,
};

// User-facing messages
pub use super::config::{NO_REPOS_MESSAGE, PATH_DISPLAY_WIDTH};

// Markers and tool versions
pub use super::marker::{
    read_marker, refresh_marker, write_marker, MarkerKind, MarkerUpdate, OnboardingMarker,
};
pub use super::toolchain::probe_tool_versions;

// Execution control
pub use super::lock::RepoLocks;
pub use super::shutdown::{channel as shutdown_channel, Shutdown, ShutdownTrigger};

// Reporting
pub use super::progress::ProgressBoard;
pub use super::stats::{RepoReport, StatusReport};

// Terminal utilities (re-exported from utils)
pub use crate::utils::set_terminal_title;
