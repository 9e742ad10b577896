#![no_main]

use libfuzzer_sys::fuzz_target;
use trust_random::flatten::flatten;
use trust_random::settings::SettingsFile;
use trust_random::store::BenchmarkStore;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // None of these may panic, whatever the document holds
        let _ = serde_json::from_str::<BenchmarkStore>(input);
        let _ = serde_json::from_str::<SettingsFile>(input);
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(input) {
            let _ = flatten(&value);
        }
    }
});
