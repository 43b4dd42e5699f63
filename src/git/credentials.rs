//! Credential injection for remote operations
//!
//! Secrets travel to git through environment variables set on the child
//! process only. The helper script passed with `-c` references the variable
//! names, never the values, so nothing sensitive shows up in argument lists
//! or logs.

use std::fmt;

const USERNAME_VAR: &str = "NIAGARA_GIT_USERNAME";
const PASSWORD_VAR: &str = "NIAGARA_GIT_PASSWORD";
const HELPER_RESET: &str = "credential.helper=";
const HELPER_SCRIPT: &str = "credential.helper=!f() { echo \"username=${NIAGARA_GIT_USERNAME}\"; echo \"password=${NIAGARA_GIT_PASSWORD}\"; }; f";

/// A string that never prints its contents
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl<'de> serde::Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Secret)
    }
}

/// Username/password pair for one repository's remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Secret,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Secret) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// `-c` arguments installing the environment-reading helper
    pub fn git_config_args() -> [&'static str; 4] {
        ["-c", HELPER_RESET, "-c", HELPER_SCRIPT]
    }

    /// Environment for the child git process
    pub fn env(&self) -> [(&'static str, &str); 2] {
        [
            (USERNAME_VAR, self.username.as_str()),
            (PASSWORD_VAR, self.password.expose()),
        ]
    }
}

/// Source of credentials keyed by repository name
pub trait CredentialStore: Send + Sync {
    fn credentials_for(&self, repository: &str) -> Option<Credentials>;
}

/// Store that never has credentials; git falls back to its own helpers
#[derive(Debug, Default, Clone)]
pub struct NoCredentials;

impl CredentialStore for NoCredentials {
    fn credentials_for(&self, _repository: &str) -> Option<Credentials> {
        None
    }
}
