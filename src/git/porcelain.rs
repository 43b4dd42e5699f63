//! Parsing of machine-readable git output
//!
//! Kept free of process execution so each classifier can be tested on plain
//! strings.

/// Porcelain v1 status codes that count as a change in the working tree or index
const CHANGE_CODES: &[char] = &['M', 'A', 'D', 'R', 'C', 'U', 'T'];
const UNTRACKED_CODE: &str = "??";
const IGNORED_CODE: &str = "!!";

/// Classified result of `git status --porcelain`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    pub has_changes: bool,
    /// Paths with a tracked change (staged or unstaged)
    pub changed: Vec<String>,
    pub untracked: Vec<String>,
}

/// Classified result of `git stash list`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StashList {
    pub has_stash: bool,
    pub count: usize,
}

/// Parses `git status --porcelain` (v1) output
pub fn parse_status_porcelain(output: &str) -> WorkingTreeStatus {
    let mut status = WorkingTreeStatus::default();

    for line in output.lines() {
        if line.len() < 3 {
            continue;
        }
        let (code, rest) = line.split_at(2);
        let path = rest.trim_start().to_string();

        if code == UNTRACKED_CODE {
            status.untracked.push(path);
        } else if code == IGNORED_CODE {
            continue;
        } else if code.chars().any(|c| CHANGE_CODES.contains(&c)) {
            status.changed.push(path);
        }
    }

    status.has_changes = !status.changed.is_empty() || !status.untracked.is_empty();
    status
}

/// Parses `git stash list` output, counting `stash@{N}` entries
pub fn parse_stash_list(output: &str) -> StashList {
    let count = output
        .lines()
        .filter(|line| is_stash_entry(line.trim_start()))
        .count();
    StashList {
        has_stash: count > 0,
        count,
    }
}

fn is_stash_entry(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("stash@{") else {
        return false;
    };
    match rest.find('}') {
        Some(end) if end > 0 => rest[..end].chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Extracts the short branch name from `git rev-parse --abbrev-ref HEAD`.
///
/// Returns `None` for a detached HEAD.
pub fn parse_current_branch(output: &str) -> Option<String> {
    let branch = output.lines().next()?.trim();
    if branch.is_empty() || branch == "HEAD" {
        None
    } else {
        Some(branch.to_string())
    }
}

/// Builds the deterministic `<prefix>-<branch>-<hash>` branch name.
///
/// Slashes in the source branch are flattened so `feature/x` does not create
/// a nested ref namespace.
pub fn deterministic_branch_name(prefix: &str, branch: &str, short_hash: &str) -> String {
    format!("{}-{}-{}", prefix, branch.replace('/', "-"), short_hash.trim())
}
