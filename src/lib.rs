//! # niagara
//!
//! `niagara` keeps a family of sibling git repositories onboarded to a shared
//! automation component and synchronized with their remotes. It powers the
//! `niagara` CLI.
//!
//! ## Core Features
//!
//! - **Discovery**: probes every directory next to the engine and finds the
//!   ones that still need onboarding.
//! - **Safe-Stash**: moves uncommitted work onto a `stash-<branch>-<hash>`
//!   branch before anything touches the working tree.
//! - **Onboarding**: pulls, registers the shared component as a submodule,
//!   commits and pushes.
//! - **Gated Sync**: fetches each onboarded repository and fast-forwards only
//!   when the fetched commit carries a valid `@force-flow` token with enough
//!   `@priority-override`; everything else lands on a review branch.
//!
//! ## Example
//!
//! ```rust,no_run
//! use niagara::flow::{authorize, MergeVerdict, SyncPolicy};
//!
//! let policy = SyncPolicy::new(100, ["release-train"]);
//! let verdict = authorize("fix: typo @priority-override:150 @force-flow:release-train", &policy);
//! assert_eq!(verdict, MergeVerdict::Authorized);
//! ```

pub mod commands;
pub mod core;
pub mod error;
pub mod flow;
pub mod git;
pub mod utils;

pub use error::{FlowError, FlowResult};
