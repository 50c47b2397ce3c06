//! Property tests for lexical module scanning.

use proptest::prelude::*;

use kiln::domain::services::{exported_names, import_specifiers, tag_references};

fn tag() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9]{0,6}-[a-z0-9]{1,6}").unwrap()
}

fn ident() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z_][A-Za-z0-9_]{0,10}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Scanning arbitrary text never panics.
    #[test]
    fn property_scanners_never_panic(code in "(?s).{0,512}") {
        let _ = import_specifiers(&code);
        let _ = tag_references(&code);
        let _ = exported_names(&code);
    }

    /// PROPERTY: Every referenced tag is found once, in sorted order.
    #[test]
    fn property_tag_references_sorted_unique(tags in proptest::collection::vec(tag(), 0..8)) {
        let code: String = tags
            .iter()
            .map(|t| format!("  return <{}></{}>;\n  h('{}', null);\n", t, t, t))
            .collect();

        let found = tag_references(&code);

        let mut expected = tags.clone();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(found, expected);
    }

    /// PROPERTY: Each `export const` line is reported as an export.
    #[test]
    fn property_export_decls_found(names in proptest::collection::vec(ident(), 1..8)) {
        let code: String = names
            .iter()
            .map(|n| format!("export const {} = 1;\n", n))
            .collect();

        let found = exported_names(&code);

        let mut expected = names.clone();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(found, expected);
    }

    /// PROPERTY: Static imports come back in source order.
    #[test]
    fn property_imports_in_source_order(names in proptest::collection::vec(ident(), 1..6)) {
        let code: String = names
            .iter()
            .map(|n| format!("import {{ x }} from './{}';\n", n))
            .collect();

        let specs = import_specifiers(&code);

        let mut expected: Vec<String> = Vec::new();
        for n in &names {
            let spec = format!("./{}", n);
            if !expected.contains(&spec) {
                expected.push(spec);
            }
        }
        prop_assert_eq!(specs, expected);
    }
}
