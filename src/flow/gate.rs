//! Merge authorization gate
//!
//! A fetched commit may be merged automatically only when its message carries
//! both an accepted `@force-flow:<token>` and an `@priority-override:<n>` that
//! meets the repository's required priority.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::core::config::DEFAULT_REQUIRED_PRIORITY;
use crate::error::{FlowError, FlowResult};

const PRIORITY_DIRECTIVE: &str = r"@priority-override:(\S+)";
const TOKEN_DIRECTIVE: &str = r"@force-flow:(\S+)";

fn priority_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PRIORITY_DIRECTIVE).expect("priority directive pattern is valid"))
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TOKEN_DIRECTIVE).expect("token directive pattern is valid"))
}

/// Per-repository auto-merge policy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPolicy {
    #[serde(default = "default_required_priority")]
    pub required_priority: i64,
    #[serde(default)]
    pub tokens: HashSet<String>,
}

fn default_required_priority() -> i64 {
    DEFAULT_REQUIRED_PRIORITY
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            required_priority: DEFAULT_REQUIRED_PRIORITY,
            tokens: HashSet::new(),
        }
    }
}

impl SyncPolicy {
    pub fn new<I, S>(required_priority: i64, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_priority,
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact, case-sensitive token match
    pub fn accepts_token(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}

/// Directives found in a commit message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    pub priority: Option<i64>,
    pub token: Option<String>,
}

impl Directives {
    /// Extracts the first occurrence of each directive.
    ///
    /// A priority value that is not an integer counts as absent.
    pub fn parse(message: &str) -> Self {
        let priority = priority_regex()
            .captures(message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok());
        let token = token_regex()
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        Self { priority, token }
    }
}

/// Gate decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeVerdict {
    Authorized,
    ReviewRequired,
}

/// Decides whether a pulled commit may be merged without review
pub fn authorize(message: &str, policy: &SyncPolicy) -> MergeVerdict {
    match explain(message, policy) {
        Ok(()) => MergeVerdict::Authorized,
        Err(_) => MergeVerdict::ReviewRequired,
    }
}

/// Same decision as [`authorize`], with the reason a merge was refused
pub fn explain(message: &str, policy: &SyncPolicy) -> FlowResult<()> {
    let directives = Directives::parse(message);

    let token_valid = directives
        .token
        .as_deref()
        .is_some_and(|token| policy.accepts_token(token));
    if !token_valid {
        let reason = match directives.token {
            Some(_) => "authorization token not accepted",
            None => "no authorization token",
        };
        return Err(FlowError::UnauthorizedMerge {
            reason: reason.to_string(),
        });
    }

    match directives.priority {
        Some(priority) if priority >= policy.required_priority => Ok(()),
        Some(priority) => Err(FlowError::UnauthorizedMerge {
            reason: format!(
                "priority {priority} below required {}",
                policy.required_priority
            ),
        }),
        None => Err(FlowError::UnauthorizedMerge {
            reason: "no priority override".to_string(),
        }),
    }
}
