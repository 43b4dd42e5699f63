//! Onboarding marker file
//!
//! The marker signals that a repository has been onboarded. It is rewritten
//! (read-modify-write) on every engine boot so the recorded versions stay
//! current, and it is never deleted by the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{FlowError, FlowResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    /// The engine's own directory
    Root,
    /// An onboarded sibling repository
    #[default]
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingMarker {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: MarkerKind,
    /// Tool versions plus any keys written by other tooling
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl OnboardingMarker {
    pub fn new(kind: MarkerKind, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn set_dependency_versions(&mut self, versions: &BTreeMap<String, String>) {
        for (tool, version) in versions {
            self.extra
                .insert(tool.clone(), serde_json::Value::String(version.clone()));
        }
    }

    pub fn dependency_version(&self, tool: &str) -> Option<&str> {
        self.extra.get(tool).and_then(|v| v.as_str())
    }

    pub fn to_json(&self) -> FlowResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| FlowError::Config(format!("cannot serialize marker: {e}")))?;
        String::from_utf8(buf).map_err(|e| FlowError::Config(e.to_string()))
    }
}

/// Reads the marker, `None` when the file does not exist
pub fn read_marker(path: &Path) -> FlowResult<Option<OnboardingMarker>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(FlowError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| FlowError::Config(format!("{}: {e}", path.display())))
}

pub fn write_marker(path: &Path, marker: &OnboardingMarker) -> FlowResult<()> {
    let mut json = marker.to_json()?;
    json.push('\n');
    std::fs::write(path, json).map_err(|e| FlowError::io(path, e))
}

/// What a boot-time refresh should record
#[derive(Debug, Clone)]
pub struct MarkerUpdate<'a> {
    pub kind: MarkerKind,
    pub version: &'a str,
    pub dependency_versions: &'a BTreeMap<String, String>,
    pub repository_name: Option<String>,
    pub repository_url: Option<String>,
}

/// Read-modify-write of the marker; unknown keys are preserved
pub fn refresh_marker(path: &Path, update: MarkerUpdate<'_>) -> FlowResult<OnboardingMarker> {
    let mut marker = read_marker(path)?.unwrap_or_default();
    marker.version = update.version.to_string();
    marker.kind = update.kind;
    marker.set_dependency_versions(update.dependency_versions);
    if update.repository_name.is_some() {
        marker.repository_name = update.repository_name;
    }
    if update.repository_url.is_some() {
        marker.repository_url = update.repository_url;
    }
    write_marker(path, &marker)?;
    Ok(marker)
}
