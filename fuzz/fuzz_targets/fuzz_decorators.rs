#![no_main]

use libfuzzer_sys::fuzz_target;

use kiln::domain::services::{decorators_to_static, find_components};

fuzz_target!(|data: &[u8]| {
    if let Ok(code) = std::str::from_utf8(data) {
        // Decorator rewriting - this should never panic
        let _ = find_components(code);
        let _ = decorators_to_static(code);
    }
});
