use std::collections::BTreeMap;

use engines_check_render::{incompatibility_message, render_markdown, render_summary};
use engines_check_types::*;

fn entry(expected: &str, actual: Option<&str>) -> SatisfactionEntry {
    SatisfactionEntry {
        expected: expected.into(),
        actual: actual.map(Into::into),
    }
}

fn failing_report() -> Report {
    Report {
        all_satisfied: false,
        satisfied: BTreeMap::from([("npm".to_string(), entry(">=9", Some("10.2.4")))]),
        not_satisfied: BTreeMap::from([
            ("node".to_string(), entry(">=18", Some("0.10.0"))),
            ("yarn".to_string(), entry("^1.22", None)),
        ]),
    }
}

fn receipt(report: Report) -> ReceiptEnvelope {
    ReceiptEnvelope {
        schema: SCHEMA_ID.to_string(),
        tool: ToolMeta { name: TOOL_NAME.to_string(), version: "0.1.0".into() },
        run: RunMeta {
            started_at: chrono::Utc::now(),
            ended_at: None,
            duration_ms: None,
            host: None,
        },
        manifest: Some("package.json".into()),
        report,
    }
}

#[test]
fn message_lists_each_unsatisfied_engine() {
    let msg = incompatibility_message(&failing_report());
    assert_eq!(
        msg,
        "Your engines are not compatible:\n  node 0.10.0, expected >=18\n  yarn undefined, expected ^1.22\n"
    );
}

#[test]
fn summary_names_failures() {
    assert_eq!(render_summary(&failing_report()), "not satisfied: node, yarn");
    assert_eq!(render_summary(&Report::vacuous()), "satisfied (0 engines checked)");
}

#[test]
fn renders_table() {
    let md = render_markdown(&receipt(failing_report()));
    assert!(md.contains("engines-check: FAIL"));
    assert!(md.contains("- Manifest: `package.json`"));
    assert!(md.contains("| node | `>=18` | `0.10.0` | not satisfied |"));
    assert!(md.contains("| npm | `>=9` | `10.2.4` | ok |"));
}

#[test]
fn renders_empty_expectation() {
    let md = render_markdown(&receipt(Report::vacuous()));
    assert!(md.contains("engines-check: PASS"));
    assert!(md.contains("_No engines declared._"));
}
