use engines_check_sources::parse_engines_str;
use proptest::prelude::*;

// =============================================================================
// package.json engines Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// engines parser never panics on arbitrary input
    #[test]
    fn engines_never_panics(s in ".*") {
        let _ = parse_engines_str(&s);
    }

    /// every string-valued engine survives parsing untouched
    #[test]
    fn engines_preserves_string_entries(
        engines in prop::collection::btree_map(
            "[a-z][a-z0-9_-]{0,12}",
            "(>=|<=|\\^|~|=)?[0-9]{1,3}(\\.[0-9]{1,3}){0,2}( \\|\\| \\^[0-9]{1,2})?",
            0..8,
        ),
    ) {
        let manifest = serde_json::json!({ "name": "fixture", "engines": engines });
        let parsed = parse_engines_str(&manifest.to_string()).unwrap();
        prop_assert_eq!(parsed, engines);
    }

    /// fields other than engines never leak into the mapping
    #[test]
    fn other_fields_are_ignored(
        name in "[a-z]{1,10}",
        version in "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}",
    ) {
        let manifest = serde_json::json!({ "name": name, "version": version });
        let parsed = parse_engines_str(&manifest.to_string()).unwrap();
        prop_assert!(parsed.is_empty());
    }
}
