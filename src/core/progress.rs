//! Per-repository progress lines

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::config::{DEFAULT_PROGRESS_BAR_LENGTH, PROGRESS_CHARS, PROGRESS_TEMPLATE};
use crate::error::{FlowError, FlowResult};
use crate::git::Status;

/// One progress line per repository in the current pass
pub struct ProgressBoard {
    multi_progress: MultiProgress,
    progress_style: ProgressStyle,
    /// Width repository names are padded to for alignment
    name_width: usize,
}

impl ProgressBoard {
    pub fn new(names: &[String]) -> FlowResult<Self> {
        Self::with_target(names, ProgressDrawTarget::stderr())
    }

    /// A board that draws nothing, for `--json` output and tests
    pub fn hidden() -> Self {
        Self {
            multi_progress: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            progress_style: ProgressStyle::default_bar(),
            name_width: 0,
        }
    }

    fn with_target(names: &[String], target: ProgressDrawTarget) -> FlowResult<Self> {
        Ok(Self {
            multi_progress: MultiProgress::with_draw_target(target),
            progress_style: create_progress_style()?,
            name_width: names.iter().map(String::len).max().unwrap_or(0),
        })
    }

    /// Adds a line for `repo_name` showing `message`
    pub fn start(&self, repo_name: &str, message: &'static str) -> ProgressBar {
        let pb = self
            .multi_progress
            .add(ProgressBar::new(DEFAULT_PROGRESS_BAR_LENGTH));
        pb.set_style(self.progress_style.clone());
        pb.set_prefix(format!("🟡 {:width$}", repo_name, width = self.name_width));
        pb.set_message(message);
        pb
    }

    pub fn finish(&self, pb: &ProgressBar, repo_name: &str, status: Status, detail: &str) {
        pb.set_prefix(format!(
            "{} {:width$}",
            status.symbol(),
            repo_name,
            width = self.name_width
        ));
        if detail.is_empty() {
            pb.finish_with_message(status.text().to_string());
        } else {
            pb.finish_with_message(format!("{} {}", status.text(), detail));
        }
    }

    pub fn clear(&self) {
        // Nothing useful to do if the terminal went away
        let _ = self.multi_progress.clear();
    }
}

fn create_progress_style() -> FlowResult<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template(PROGRESS_TEMPLATE)
        .map_err(|e| FlowError::Config(format!("invalid progress template: {e}")))?
        .progress_chars(PROGRESS_CHARS))
}
