//! Human-readable renderings of satisfaction reports.
//!
//! Rendering is pure and deterministic: engines appear in name order.

use engines_check_types::{ReceiptEnvelope, Report, SatisfactionEntry};

pub const INCOMPATIBLE_HEADER: &str = "Your engines are not compatible:";

/// Shown in place of an actual version nobody could determine.
pub const UNKNOWN_VERSION: &str = "undefined";

/// Message carried by an incompatibility failure.
///
/// One line per unsatisfied engine under a fixed header, each line
/// newline-terminated: `  node 0.10.0, expected >=18`.
pub fn incompatibility_message(report: &Report) -> String {
    let mut out = format!("{}\n", INCOMPATIBLE_HEADER);
    for (name, entry) in &report.not_satisfied {
        out.push_str(&format!(
            "  {} {}, expected {}\n",
            name,
            actual_or_unknown(entry),
            entry.expected
        ));
    }
    out
}

/// One-line status for terminals.
pub fn render_summary(report: &Report) -> String {
    if report.all_satisfied {
        return format!("satisfied ({} engines checked)", report.satisfied.len());
    }
    let names: Vec<&str> = report.not_satisfied.keys().map(String::as_str).collect();
    format!("not satisfied: {}", names.join(", "))
}

pub fn render_markdown(receipt: &ReceiptEnvelope) -> String {
    let report = &receipt.report;
    let status = if report.all_satisfied { "PASS" } else { "FAIL" };

    let mut out = String::new();
    out.push_str(&format!("## engines-check: {}\n\n", status));
    out.push_str(&format!(
        "- Engines: {} satisfied, {} not satisfied\n",
        report.satisfied.len(),
        report.not_satisfied.len()
    ));
    if let Some(manifest) = &receipt.manifest {
        out.push_str(&format!("- Manifest: `{}`\n", manifest));
    }
    out.push('\n');

    if report.satisfied.is_empty() && report.not_satisfied.is_empty() {
        out.push_str("_No engines declared._\n");
        return out;
    }

    out.push_str("| Engine | Expected | Actual | Status |\n");
    out.push_str("|---|---|---|---|\n");

    let rows = report
        .not_satisfied
        .iter()
        .map(|(n, e)| (n, e, "not satisfied"))
        .chain(report.satisfied.iter().map(|(n, e)| (n, e, "ok")));
    for (name, entry, state) in rows {
        out.push_str(&format!(
            "| {} | `{}` | `{}` | {} |\n",
            name,
            entry.expected,
            actual_or_unknown(entry),
            state
        ));
    }

    out
}

fn actual_or_unknown(entry: &SatisfactionEntry) -> &str {
    entry.actual.as_deref().unwrap_or(UNKNOWN_VERSION)
}
