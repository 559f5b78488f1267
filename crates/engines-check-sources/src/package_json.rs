//! `package.json` engines reader.

use std::fs;
use std::path::Path;

use anyhow::Context;
use engines_check_types::{string_entries, EngineMap, ENGINES_KEY};

pub const MANIFEST_FILE: &str = "package.json";

/// Read the `engines` field of a `package.json` file.
pub fn parse_engines(path: &Path) -> anyhow::Result<EngineMap> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_engines_str(&text).with_context(|| format!("parse {}", path.display()))
}

/// Parse `package.json` content and extract `engines`.
///
/// A missing `engines` field is an empty mapping. Entries whose value isn't a
/// string are skipped.
pub fn parse_engines_str(text: &str) -> anyhow::Result<EngineMap> {
    let value: serde_json::Value = serde_json::from_str(text).context("invalid JSON")?;

    let obj = value
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("manifest must be a JSON object"))?;

    match obj.get(ENGINES_KEY) {
        None | Some(serde_json::Value::Null) => Ok(EngineMap::new()),
        Some(serde_json::Value::Object(engines)) => Ok(string_entries(engines)),
        Some(_) => anyhow::bail!("`engines` must be an object"),
    }
}
