//! Per-repository outcome status and display helpers

use serde::Serialize;

/// Status of one repository after a workflow run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Shared component registered, committed and pushed
    Onboarded,
    /// Repository was eligible but a dry run changed nothing
    Eligible,
    /// Working tree already matches its upstream
    UpToDate,
    /// Authorized remote changes were fast-forwarded
    FastForwarded,
    /// Remote changes were parked on a review branch
    PendingReview,
    /// Repository was skipped (no upstream, detached HEAD, ...)
    Skipped,
    /// Shutdown arrived before the workflow finished
    Cancelled,
    /// A workflow step failed
    Failed,
}

impl Status {
    /// Returns the emoji symbol for this status
    pub fn symbol(&self) -> &str {
        match self {
            Status::Onboarded | Status::UpToDate | Status::FastForwarded => "🟢",
            Status::Eligible | Status::PendingReview => "🟡",
            Status::Skipped | Status::Cancelled => "🟠",
            Status::Failed => "🔴",
        }
    }

    /// Returns the text representation of this status
    pub fn text(&self) -> &str {
        match self {
            Status::Onboarded => "onboarded",
            Status::Eligible => "eligible",
            Status::UpToDate => "up-to-date",
            Status::FastForwarded => "merged",
            Status::PendingReview => "review",
            Status::Skipped => "skip",
            Status::Cancelled => "cancelled",
            Status::Failed => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed)
    }
}
