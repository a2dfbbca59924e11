#![no_main]

use libfuzzer_sys::fuzz_target;
use sinkhole::config::types::ConfigFile;

fuzz_target!(|data: &[u8]| {
    let parsed: Option<ConfigFile> = serde_json::from_slice(data).ok();
    let applied = sinkhole::fuzzing::apply_config_from_json(data);
    if applied.is_ok() {
        if let Some(config) = parsed {
            if let Some(sources) = config.data_sources.as_ref() {
                debug_assert!(!sources.is_empty());
            }
            if let Some(workers) = config.concurrency_factor {
                debug_assert!(workers >= 1);
            }
            if let Some(attempts) = config.max_attempts {
                debug_assert!(attempts >= 1);
            }
        }
    }
});
