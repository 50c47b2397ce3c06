#![no_main]

use libfuzzer_sys::fuzz_target;

use kiln::domain::services::{exported_names, import_refs, parse_component_metas, tag_references};

fuzz_target!(|data: &[u8]| {
    if let Ok(code) = std::str::from_utf8(data) {
        // Lexical scans of emitted modules - these should never panic
        let _ = import_refs(code);
        let _ = exported_names(code);
        let _ = tag_references(code);
        let _ = parse_component_metas(code);
    }
});
