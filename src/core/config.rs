//! Configuration constants and settings

// Concurrency Configuration
//
// Probes and sync runs are I/O-bound git processes; the cap keeps a large
// sibling family from flooding the remote host with parallel fetches.

// Default concurrency cap for in-flight repositories
pub const GIT_CONCURRENT_CAP: usize = 12;

/// Determines the concurrency limit for repository workflows
///
/// Priority order:
/// 1. --sequential flag → 1
/// 2. --jobs N flag → N
/// 3. NIAGARA_CONCURRENCY env var → N
/// 4. Smart default → min(CPU_CORES + 2, 12)
pub fn get_git_concurrency(jobs: Option<usize>, sequential: bool) -> usize {
    if sequential {
        return 1;
    }

    if let Some(n) = jobs {
        return n.max(1); // Ensure at least 1
    }

    if let Ok(env_concurrency) = std::env::var(CONCURRENCY_ENV_VAR) {
        if let Ok(n) = env_concurrency.parse::<usize>() {
            if n > 0 {
                return n;
            }
        }
    }

    let cpu_count = num_cpus::get();
    (cpu_count + 2).min(GIT_CONCURRENT_CAP)
}

pub const CONCURRENCY_ENV_VAR: &str = "NIAGARA_CONCURRENCY";

// Timeouts
pub const COMMAND_TIMEOUT_SECS: u64 = 180; // 3 minutes per external command
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

// Onboarding layout
pub const MARKER_FILE_NAME: &str = "waterfall.json";
pub const SHARED_COMPONENT_DIR: &str = "niagara";
pub const SHARED_COMPONENT_URL: &str = "https://github.com/volkovasystems/niagara.git";
pub const ONBOARDING_COMMIT_MESSAGE: &str = "added niagara sub module";
pub const STASH_BRANCH_PREFIX: &str = "stash";
pub const REVIEW_BRANCH_PREFIX: &str = "review";

// Sibling discovery
pub const DEFAULT_EXCLUSION_PATTERN: &str = "library|niagara";

// Configuration files
pub const SETTINGS_FILE_NAME: &str = "niagara.toml";
pub const SPRING_FILE_NAME: &str = "spring.json";
pub const RIVER_FILE_NAME: &str = "river.json";
pub const APP_CONFIG_DIR: &str = "niagara";

// Merge policy defaults
pub const DEFAULT_REQUIRED_PRIORITY: i64 = 100;

// Tools whose versions are recorded in markers
pub const DEFAULT_PROBED_TOOLS: &[&str] = &["git", "node", "grunt", "mongod", "redis-server"];

// UI Constants
pub const NO_REPOS_MESSAGE: &str = "No sibling repositories found.";
pub const PROGRESS_CHARS: &str = "##-";
pub const PROGRESS_TEMPLATE: &str = "{prefix:.bold} {wide_msg}";
pub const DEFAULT_PROGRESS_BAR_LENGTH: u64 = 100;

// Display formatting constants
pub const PATH_DISPLAY_WIDTH: usize = 30;
pub const ERROR_MESSAGE_MAX_LENGTH: usize = 60;
