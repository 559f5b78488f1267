#![no_main]

use libfuzzer_sys::fuzz_target;

// Input is `<version>\n<range>`.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let (version, range) = text.split_once('\n').unwrap_or((text, "*"));
        let _ = engines_check_domain::coerce_version(version);
        let _ = engines_check_domain::satisfies(Some(version), range);
        let _ = engines_check_domain::satisfies(None, range);
    }
});
