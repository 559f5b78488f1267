//! npm-style range expressions evaluated with the `semver` crate.
//!
//! `semver::VersionReq` speaks Cargo's dialect, so range strings as they appear
//! in `package.json` are rewritten first: `||` alternatives become separate
//! requirements, space-separated comparators are joined with commas, hyphen
//! ranges become a `>=`/`<=` pair, and a bare version means an exact match.

use semver::{Version, VersionReq};

const OPERATOR_CHARS: &[char] = &['<', '>', '=', '~', '^'];

/// Does `actual` satisfy `range`?
///
/// An unknown actual version never satisfies anything, not even `*`. A range
/// that can't be parsed only matches an identical version string.
pub fn satisfies(actual: Option<&str>, range: &str) -> bool {
    let Some(have) = actual else {
        return false;
    };
    let Some(version) = coerce_version(have) else {
        return false;
    };

    match parse_range(range) {
        Some(alternatives) => alternatives.iter().any(|req| req.matches(&version)),
        None => have.trim() == range.trim(),
    }
}

/// Parse a version, padding missing minor/patch components with zeros.
///
/// Accepts a leading `v` or `=` the way tool output and manifests commonly
/// carry them (`v20.11.0`, `=1.2`).
pub fn coerce_version(raw: &str) -> Option<Version> {
    let s = raw.trim();
    let s = s.strip_prefix('=').unwrap_or(s).trim_start();
    let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
    if s.is_empty() {
        return None;
    }

    let split = s.find(['-', '+']).unwrap_or(s.len());
    let (core, suffix) = s.split_at(split);
    let coerced = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, suffix),
        2 => format!("{}.0{}", core, suffix),
        _ => s.to_string(),
    };

    Version::parse(&coerced).ok()
}

/// Translate an npm range into one `VersionReq` per `||` alternative.
pub fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    range.split("||").map(parse_alternative).collect()
}

fn parse_alternative(alt: &str) -> Option<VersionReq> {
    let tokens = glue_operators(alt);
    let mut comparators: Vec<String> = vec![];

    let mut i = 0;
    while i < tokens.len() {
        if tokens.get(i + 1).map(String::as_str) == Some("-") {
            let upper = tokens.get(i + 2)?;
            comparators.push(format!(">={}", strip_v(&tokens[i])));
            comparators.push(format!("<={}", strip_v(upper)));
            i += 3;
            continue;
        }
        comparators.push(normalize_comparator(&tokens[i])?);
        i += 1;
    }

    if comparators.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

/// Split on whitespace, re-attaching operators written apart from their version (`>= 16`).
fn glue_operators(alt: &str) -> Vec<String> {
    let mut out: Vec<String> = vec![];
    let mut pending = String::new();

    for tok in alt.split_whitespace() {
        if tok.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            pending.push_str(tok);
            continue;
        }
        out.push(format!("{}{}", pending, tok));
        pending.clear();
    }
    if !pending.is_empty() {
        out.push(pending);
    }
    out
}

fn normalize_comparator(tok: &str) -> Option<String> {
    let split = tok
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(tok.len());
    let (op, version) = tok.split_at(split);
    let version = strip_v(version);
    if version.is_empty() {
        return None;
    }

    if op.is_empty() {
        // A bare version is exact in npm but caret in Cargo.
        if is_wildcard(version) {
            return Some(version.to_string());
        }
        return Some(format!("={}", version));
    }
    Some(format!("{}{}", op, version))
}

fn is_wildcard(version: &str) -> bool {
    version
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"))
}

fn strip_v(s: &str) -> &str {
    s.strip_prefix(['v', 'V']).unwrap_or(s)
}
