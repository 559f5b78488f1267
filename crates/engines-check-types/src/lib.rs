//! Engine maps, reports, receipts and the error type shared by every
//! engines-check crate.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TOOL_NAME: &str = "engines-check";
pub const SCHEMA_ID: &str = "engines-check.report.v1";

/// Manifest key holding the engine constraints.
pub const ENGINES_KEY: &str = "engines";

/// Engine names that are resolved automatically when the caller doesn't know them.
pub mod engines {
    pub const NODE: &str = "node";
    pub const NPM: &str = "npm";
}

/// Engine name -> version (actual) or range expression (expected).
pub type EngineMap = BTreeMap<String, String>;

/// Evaluation context for a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Engine {
    pub actual: EngineMap,
    pub expected: EngineMap,
}

/// Where expected ranges come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Wanted {
    /// Search for the nearest manifest upward from the working directory.
    #[default]
    DefaultCwd,
    /// Search for the nearest manifest upward from this path.
    ManifestRoot(PathBuf),
    /// Use this mapping as the expectation.
    Explicit(EngineMap),
}

impl Wanted {
    /// Decode the loosely-typed shapes callers pass around as JSON.
    ///
    /// `null` searches from the working directory, a string is a manifest root,
    /// an object with an object-valued `engines` field uses that field, and any
    /// other object is taken as the engines mapping itself. Non-string values in
    /// the mapping are skipped.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, EnginesError> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(Wanted::DefaultCwd),
            Value::String(path) => Ok(Wanted::ManifestRoot(PathBuf::from(path))),
            Value::Object(obj) => {
                let mapping = match obj.get(ENGINES_KEY) {
                    Some(Value::Object(nested)) => nested,
                    _ => obj,
                };
                Ok(Wanted::Explicit(string_entries(mapping)))
            }
            other => Err(EnginesError::Parse(format!(
                "expected null, a manifest path or an engines object, got {}",
                json_kind(other)
            ))),
        }
    }
}

/// Collect the string-valued entries of a JSON object into an [`EngineMap`].
pub fn string_entries(obj: &serde_json::Map<String, serde_json::Value>) -> EngineMap {
    obj.iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Options recognized by `check_with`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Produce a [`Report`] instead of a single boolean.
    #[serde(default)]
    pub detail: bool,
}

/// One engine's expected range next to the version actually in use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SatisfactionEntry {
    pub expected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

/// Detailed satisfaction breakdown.
///
/// Bucket maps are omitted from JSON when empty; `allSatisfied` is always present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub all_satisfied: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub satisfied: BTreeMap<String, SatisfactionEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub not_satisfied: BTreeMap<String, SatisfactionEntry>,
}

impl Report {
    /// Report for an empty expectation: nothing to check, so everything passes.
    pub fn vacuous() -> Self {
        Self {
            all_satisfied: true,
            satisfied: BTreeMap::new(),
            not_satisfied: BTreeMap::new(),
        }
    }
}

/// Result of `check_with`, shaped by [`CheckOptions::detail`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Summary(bool),
    Detailed(Report),
}

impl Outcome {
    pub fn all_satisfied(&self) -> bool {
        match self {
            Outcome::Summary(ok) => *ok,
            Outcome::Detailed(report) => report.all_satisfied,
        }
    }
}

/// Raised by assert mode when at least one engine is unsatisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incompatibility {
    pub message: String,
    pub report: Report,
}

#[derive(Debug, thiserror::Error)]
pub enum EnginesError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("{}", .0.message)]
    Incompatible(Incompatibility),
}

impl EnginesError {
    /// True when expected or actual versions could not be determined.
    pub fn is_resolution_failure(&self) -> bool {
        !matches!(self, EnginesError::Incompatible(_))
    }

    /// The report attached to an incompatibility failure.
    pub fn report(&self) -> Option<&Report> {
        match self {
            EnginesError::Incompatible(inc) => Some(&inc.report),
            _ => None,
        }
    }
}

// =============================================================================
// RECEIPT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunMeta {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<HostMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostMeta {
    pub os: String,
    pub arch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Persisted artifact of a CLI run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiptEnvelope {
    pub schema: String,
    pub tool: ToolMeta,
    pub run: RunMeta,
    /// Manifest the expectations were read from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    pub report: Report,
}
