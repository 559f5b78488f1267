//! Pure evaluation logic: compare actual engine versions against expected ranges.
//!
//! Nothing in here touches the filesystem or spawns processes. Ordering is
//! deterministic because [`EngineMap`] is ordered.

pub mod range;

use std::collections::BTreeMap;

use engines_check_types::{Engine, EngineMap, Outcome, Report, SatisfactionEntry};

pub use range::{coerce_version, satisfies};

/// One expected engine after evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluated {
    pub name: String,
    pub satisfied: bool,
    pub data: SatisfactionEntry,
}

/// Evaluate every expected engine, in name order.
///
/// Engines present only in `actual` are ignored.
pub fn evaluate_each(engine: &Engine) -> Vec<Evaluated> {
    engine
        .expected
        .iter()
        .map(|(name, expected)| {
            let actual = engine.actual.get(name).cloned();
            Evaluated {
                name: name.clone(),
                satisfied: satisfies(actual.as_deref(), expected),
                data: SatisfactionEntry {
                    expected: expected.clone(),
                    actual,
                },
            }
        })
        .collect()
}

/// Build the detailed report by partitioning the evaluated engines.
pub fn evaluate(engine: &Engine) -> Report {
    if engine.expected.is_empty() {
        return Report::vacuous();
    }

    let (ok, bad): (Vec<Evaluated>, Vec<Evaluated>) =
        evaluate_each(engine).into_iter().partition(|e| e.satisfied);

    let satisfied: BTreeMap<String, SatisfactionEntry> =
        ok.into_iter().map(|e| (e.name, e.data)).collect();
    let not_satisfied: BTreeMap<String, SatisfactionEntry> =
        bad.into_iter().map(|e| (e.name, e.data)).collect();

    Report {
        all_satisfied: not_satisfied.is_empty(),
        satisfied,
        not_satisfied,
    }
}

/// True when every expected engine is satisfied.
pub fn all_satisfied(engine: &Engine) -> bool {
    engine
        .expected
        .iter()
        .all(|(name, range)| satisfies(engine.actual.get(name).map(String::as_str), range))
}

/// Evaluate and shape the result as a boolean or a detailed report.
pub fn compare(engine: &Engine, detail: bool) -> Outcome {
    if detail {
        Outcome::Detailed(evaluate(engine))
    } else {
        Outcome::Summary(all_satisfied(engine))
    }
}

/// Drop engines the caller asked us not to look at.
pub fn without_ignored(mut expected: EngineMap, ignore: &[String]) -> EngineMap {
    expected.retain(|name, _| !ignore.iter().any(|i| i == name));
    expected
}
