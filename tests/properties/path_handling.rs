//! Property tests for path normalization.

use std::path::{Path, PathBuf};

use proptest::prelude::*;

use kiln::domain::value_objects::path::is_within;
use kiln::domain::value_objects::{normalize_path, relative_to, resolve_path};

fn segment() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9_-][A-Za-z0-9._-]{0,11}")
        .unwrap()
        .prop_filter("not a dot segment", |s| s != "." && s != "..")
}

fn relative_path() -> impl Strategy<Value = String> {
    proptest::collection::vec(segment(), 1..=5).prop_map(|segments| segments.join("/"))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Normalization never panics on arbitrary input.
    #[test]
    fn property_normalize_never_panics(s in "(?s).{0,256}") {
        let _ = normalize_path(&s);
    }

    /// PROPERTY: Normalizing twice changes nothing.
    #[test]
    fn property_normalize_is_idempotent(s in "[A-Za-z0-9./\\\\_-]{0,64}") {
        let once = normalize_path(&s);
        prop_assert_eq!(normalize_path(&once), once);
    }

    /// PROPERTY: Normalized paths have no `.` segments, and `..` only leads.
    #[test]
    fn property_normalized_has_no_inner_dots(s in "[a-z./]{0,64}") {
        let normalized = normalize_path(&s);
        let text = normalized.to_string_lossy().to_string();
        if text != "." {
            let mut seen_name = false;
            for part in text.split('/').filter(|p| !p.is_empty()) {
                prop_assert_ne!(part, ".");
                if part == ".." {
                    prop_assert!(!seen_name, "'..' after a name in {}", text);
                } else {
                    seen_name = true;
                }
            }
        }
    }

    /// PROPERTY: A plain relative path resolves inside its base and back.
    #[test]
    fn property_resolve_then_relative(rel in relative_path()) {
        let base = Path::new("/app/src");
        let resolved = resolve_path(base, &rel);

        prop_assert!(is_within(&resolved, base));
        prop_assert_eq!(relative_to(&resolved, base), Some(PathBuf::from(&rel)));
    }

    /// PROPERTY: Absolute paths ignore the base.
    #[test]
    fn property_absolute_ignores_base(rel in relative_path()) {
        let absolute = format!("/{}", rel);
        prop_assert_eq!(resolve_path("/somewhere/else", &absolute), normalize_path(&absolute));
    }
}
