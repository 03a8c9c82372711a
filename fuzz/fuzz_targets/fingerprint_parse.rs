#![no_main]

use libfuzzer_sys::fuzz_target;
use logsieve_pattern::Fingerprint;

fuzz_target!(|data: &str| {
    if let Ok(fp) = data.parse::<Fingerprint>() {
        assert_eq!(fp.to_string(), data.to_ascii_lowercase());
    }
});
