use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use serde_json::Value;

const SCHEMA_PATH: &str = "schemas/engines-check.report.v1.json";
const FIXTURES_DIR: &str = "xtask/fixtures";

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("schema-check") => schema_check(),
        _ => {
            eprintln!("xtask commands:");
            eprintln!("  schema-check   Validate the receipt schema and example receipts");
            Ok(())
        }
    }
}

fn schema_check() -> anyhow::Result<()> {
    let schema_json = load_json(Path::new(SCHEMA_PATH))?;
    let schema = jsonschema::JSONSchema::compile(&schema_json)
        .map_err(|e| anyhow::anyhow!("compile {}: {}", SCHEMA_PATH, e))?;
    eprintln!("ok: compiled {}", SCHEMA_PATH);

    let mut checked = 0usize;
    for entry in fs::read_dir(FIXTURES_DIR).with_context(|| format!("read {}", FIXTURES_DIR))? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            validate_fixture(&path, &schema)?;
            checked += 1;
        }
    }
    if checked == 0 {
        bail!("no example receipts under {}", FIXTURES_DIR);
    }

    eprintln!("schema-check: {} receipts validated", checked);
    Ok(())
}

fn load_json(path: &Path) -> anyhow::Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

fn validate_fixture(path: &Path, schema: &jsonschema::JSONSchema) -> anyhow::Result<()> {
    let json = load_json(path)?;

    if let Err(errors) = schema.validate(&json) {
        let messages: Vec<String> = errors
            .map(|e| format!("  - {}: {}", e.instance_path, e))
            .collect();
        bail!("{} failed schema validation:\n{}", path.display(), messages.join("\n"));
    }

    // The schema can't express that the verdict agrees with the buckets.
    let report = &json["report"];
    let all_satisfied = report["allSatisfied"].as_bool().unwrap_or(false);
    let has_failures = report
        .get("notSatisfied")
        .and_then(Value::as_object)
        .is_some_and(|m| !m.is_empty());
    if all_satisfied == has_failures {
        bail!(
            "{}: allSatisfied={} disagrees with notSatisfied",
            path.display(),
            all_satisfied
        );
    }

    eprintln!("ok: validated {}", path.display());
    Ok(())
}
