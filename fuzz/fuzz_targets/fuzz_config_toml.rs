#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Fuzz kiln.toml parsing - this should never panic
        if let Ok(config) = toml::from_str::<kiln::Config>(content) {
            let _ = kiln::config::validate_config(config, std::path::Path::new("/"));
        }
    }
});
