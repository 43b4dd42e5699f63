//! Public API for git operations.
//!
//! This module provides the stable public API for git-related functionality:
//! - Command execution with a bounded wait
//! - Porcelain parsing into typed results
//! - Credential injection for remote operations
//!
//! ## Example: Checking for changes
//!
//! ```rust,no_run
//! use niagara::git::{has_uncommitted_changes, ProcessRunner};
//! use std::path::Path;
//!
//! async fn check(path: &Path) {
//!     let runner = ProcessRunner::default();
//!     if has_uncommitted_changes(&runner, path).await.unwrap_or(false) {
//!         println!("Repository has changes");
//!     }
//! }
//! ```

// Execution
pub use super::runner::{CommandOutput, ProcessRunner};

// Status
pub use super::status::Status;

// Parsing boundary
pub use super::porcelain::{
    deterministic_branch_name, parse_stash_list, parse_status_porcelain, StashList,
    WorkingTreeStatus,
};

// Credentials
pub use super::credentials::{CredentialStore, Credentials, NoCredentials, Secret};

// Operations used by the workflows and integration tests
pub use super::operations::{
    branch_exists, current_branch, has_uncommitted_changes, is_work_tree_root, rev_parse,
    short_hash, stash_list, working_tree_status,
};
