//! Aggregate status report for onboarding sweeps and sync ticks

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::config::{ERROR_MESSAGE_MAX_LENGTH, PATH_DISPLAY_WIDTH};
use crate::git::Status;

/// Outcome of one repository in one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoReport {
    pub name: String,
    pub path: String,
    pub status: Status,
    /// Step that failed, for failed/skipped/cancelled entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub message: String,
}

impl RepoReport {
    pub fn new(name: impl Into<String>, path: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            status,
            step: None,
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

/// Report for one pass over the siblings
///
/// Counters are atomic so concurrent workflows can record without contention;
/// the entry list stays behind a Mutex.
#[derive(Debug)]
pub struct StatusReport {
    pub operation: &'static str,
    pub started_at: DateTime<Utc>,
    pub succeeded: AtomicU64,
    pub pending_review: AtomicU64,
    pub skipped: AtomicU64,
    pub failed: AtomicU64,
    entries: Mutex<Vec<RepoReport>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportTotals {
    succeeded: u64,
    pending_review: u64,
    skipped: u64,
    failed: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportSnapshot<'a> {
    operation: &'a str,
    started_at: DateTime<Utc>,
    generated_at: DateTime<Utc>,
    totals: ReportTotals,
    repositories: Vec<RepoReport>,
}

impl StatusReport {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            started_at: Utc::now(),
            succeeded: AtomicU64::new(0),
            pending_review: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, entry: RepoReport) {
        let counter = match entry.status {
            Status::Onboarded | Status::Eligible | Status::UpToDate | Status::FastForwarded => {
                &self.succeeded
            }
            Status::PendingReview => &self.pending_review,
            Status::Skipped | Status::Cancelled => &self.skipped,
            Status::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        match self.entries.lock() {
            Ok(mut guard) => guard.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    /// Entries sorted by repository name
    pub fn entries(&self) -> Vec<RepoReport> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_failures(&self) -> bool {
        self.failed.load(Ordering::Relaxed) > 0
    }

    /// One-line summary of the pass
    pub fn generate_summary(&self, duration: Duration) -> String {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let review = self.pending_review.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);

        let mut summary = format!(
            "✅ {} completed in {:.1}s • {} ok",
            self.operation,
            duration.as_secs_f64(),
            succeeded
        );
        if review > 0 {
            summary.push_str(&format!(" • {review} review"));
        }
        if skipped > 0 {
            summary.push_str(&format!(" • {skipped} skipped"));
        }
        if failed > 0 {
            summary.push_str(&format!(" • {failed} failed"));
        }
        summary
    }

    /// Grouped trees of repositories that need attention
    pub fn generate_detailed_summary(&self) -> String {
        let entries = self.entries();
        let mut lines = Vec::new();

        let sections: [(&str, &[Status]); 3] = [
            ("🔴 FAILED REPOS", &[Status::Failed]),
            ("🟡 PENDING REVIEW", &[Status::PendingReview]),
            ("🟠 SKIPPED", &[Status::Skipped, Status::Cancelled]),
        ];

        for (title, statuses) in sections {
            let group: Vec<&RepoReport> = entries
                .iter()
                .filter(|e| statuses.contains(&e.status))
                .collect();
            if group.is_empty() {
                continue;
            }

            lines.push(format!("{title} ({})", group.len()));
            for (i, entry) in group.iter().enumerate() {
                let tree_char = if i == group.len() - 1 { "└─" } else { "├─" };
                let short_path = crate::utils::shorten_path(&entry.path, PATH_DISPLAY_WIDTH);
                let detail = match &entry.step {
                    Some(step) => format!("{step}: {}", clean_error_message(&entry.message)),
                    None => clean_error_message(&entry.message),
                };
                lines.push(format!(
                    "   {} {:20} {:30} # {}",
                    tree_char, entry.name, short_path, detail
                ));
            }
            lines.push(String::new());
        }

        // Remove trailing blank line if it exists
        if lines.last() == Some(&String::new()) {
            lines.pop();
        }

        lines.join("\n")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let snapshot = ReportSnapshot {
            operation: self.operation,
            started_at: self.started_at,
            generated_at: Utc::now(),
            totals: ReportTotals {
                succeeded: self.succeeded.load(Ordering::Relaxed),
                pending_review: self.pending_review.load(Ordering::Relaxed),
                skipped: self.skipped.load(Ordering::Relaxed),
                failed: self.failed.load(Ordering::Relaxed),
            },
            repositories: self.entries(),
        };
        serde_json::to_string_pretty(&snapshot)
    }
}

/// Collapses whitespace and truncates long messages for display
pub(crate) fn clean_error_message(error: &str) -> String {
    let cleaned = error.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() > ERROR_MESSAGE_MAX_LENGTH {
        let truncated: String = cleaned.chars().take(ERROR_MESSAGE_MAX_LENGTH - 3).collect();
        format!("{truncated}...")
    } else {
        cleaned
    }
}
