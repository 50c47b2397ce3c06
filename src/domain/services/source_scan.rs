//! Lexical scanning of emitted modules
//!
//! These helpers only look at module text: import/export statements, custom
//! element tag references and the static component declarations written by
//! the decorator transform. Both the program engine and the metadata phase
//! rely on them, so they live here and stay free of I/O.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::domain::entities::ComponentMeta;

lazy_static! {
    static ref IMPORT_FROM_RE: Regex = Regex::new(
        r#"(?m)^[ \t]*(?:import\s[^'";]*?\bfrom|export\s*(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from)\s*['"]([^'"]+)['"][ \t]*;?"#
    )
    .unwrap();
    static ref IMPORT_BARE_RE: Regex =
        Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"]+)['"][ \t]*;?"#).unwrap();
    static ref DYNAMIC_IMPORT_RE: Regex =
        Regex::new(r#"\bimport\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
    static ref JSX_TAG_RE: Regex =
        Regex::new(r"<([a-z][a-z0-9]*(?:-[a-z0-9]+)+)[\s/>]").unwrap();
    static ref H_TAG_RE: Regex =
        Regex::new(r#"\bh\(\s*['"]([a-z][a-z0-9]*(?:-[a-z0-9]+)+)['"]"#).unwrap();
    static ref EXPORT_DECL_RE: Regex = Regex::new(
        r"(?m)^[ \t]*export\s+(?:default\s+)?(?:abstract\s+)?(?:async\s+)?(?:class|function\*?|const|let|var|interface|type|enum)\s+([A-Za-z_$][\w$]*)"
    )
    .unwrap();
    static ref EXPORT_LIST_RE: Regex = Regex::new(r"(?m)^[ \t]*export\s*\{([^}]*)\}").unwrap();
    static ref CMP_META_RE: Regex =
        Regex::new(r"static get cmpMeta\(\) \{ return (\{.*\}); \}").unwrap();
}

/// One static import/re-export statement in a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub specifier: String,
    /// Byte range of the whole statement, empty for dynamic imports
    pub span: Range<usize>,
    pub dynamic: bool,
}

/// All import specifiers in source order
pub fn import_refs(code: &str) -> Vec<ImportRef> {
    let mut refs: Vec<ImportRef> = Vec::new();
    for re in [&*IMPORT_FROM_RE, &*IMPORT_BARE_RE] {
        for caps in re.captures_iter(code) {
            if let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) {
                refs.push(ImportRef {
                    specifier: spec.as_str().to_string(),
                    span: whole.start()..whole.end(),
                    dynamic: false,
                });
            }
        }
    }
    for caps in DYNAMIC_IMPORT_RE.captures_iter(code) {
        if let Some(spec) = caps.get(1) {
            refs.push(ImportRef {
                specifier: spec.as_str().to_string(),
                span: spec.start()..spec.start(),
                dynamic: true,
            });
        }
    }
    refs.sort_by_key(|r| r.span.start);
    refs
}

/// Unique import specifiers in source order
pub fn import_specifiers(code: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for r in import_refs(code) {
        if !seen.contains(&r.specifier) {
            seen.push(r.specifier);
        }
    }
    seen
}

pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

/// Custom element tags referenced from JSX or `h()` calls, sorted
pub fn tag_references(code: &str) -> Vec<String> {
    let mut tags: Vec<String> = JSX_TAG_RE
        .captures_iter(code)
        .chain(H_TAG_RE.captures_iter(code))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Names a module exports
pub fn exported_names(code: &str) -> Vec<String> {
    let mut names: Vec<String> = EXPORT_DECL_RE
        .captures_iter(code)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();
    for caps in EXPORT_LIST_RE.captures_iter(code) {
        let Some(list) = caps.get(1) else { continue };
        for item in list.as_str().split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let exported = item.rsplit(" as ").next().unwrap_or(item).trim();
            names.push(exported.to_string());
        }
    }
    names.sort();
    names.dedup();
    names
}

/// The getter the decorator transform writes into a component class
pub fn render_cmp_meta_getter(meta: &ComponentMeta) -> Result<String, serde_json::Error> {
    Ok(format!(
        "static get cmpMeta() {{ return {}; }}",
        serde_json::to_string(meta)?
    ))
}

/// Parse every static component declaration in an emitted module
pub fn parse_component_metas(code: &str) -> Result<Vec<ComponentMeta>, serde_json::Error> {
    CMP_META_RE
        .captures_iter(code)
        .filter_map(|caps| caps.get(1))
        .map(|json| serde_json::from_str::<ComponentMeta>(json.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = r#"import { h, Component } from '@kiln/core';
import {
  formatName,
  other as alias,
} from './utils/format';
import './global.css';
export * from "../shared";
export { Foo as Bar } from './foo';

export class MyCmp {
  render() {
    const lazy = import('./lazy');
    return <div><my-child first="a"></my-child><my-icon/></div>;
  }
}
export const VERSION = '1';
export { helper, thing as renamed };
"#;

    #[test]
    fn finds_all_import_kinds_in_order() {
        let specs = import_specifiers(MODULE);
        assert_eq!(
            specs,
            vec![
                "@kiln/core",
                "./utils/format",
                "./global.css",
                "../shared",
                "./foo",
                "./lazy",
            ]
        );
        let refs = import_refs(MODULE);
        let multi = refs.iter().find(|r| r.specifier == "./utils/format").unwrap();
        assert!(MODULE[multi.span.clone()].starts_with("import {"));
        assert!(MODULE[multi.span.clone()].ends_with("';"));
        assert!(refs.iter().any(|r| r.dynamic && r.specifier == "./lazy"));
    }

    #[test]
    fn finds_tag_references() {
        assert_eq!(tag_references(MODULE), vec!["my-child", "my-icon"]);
        assert_eq!(tag_references("h('x-one', null); h(\"div\")"), vec!["x-one"]);
    }

    #[test]
    fn finds_exports() {
        assert_eq!(
            exported_names(MODULE),
            vec!["Bar", "MyCmp", "VERSION", "helper", "renamed"]
        );
    }

    #[test]
    fn cmp_meta_getter_parses_back() {
        let meta = ComponentMeta {
            tag_name: "my-cmp".into(),
            class_name: "MyCmp".into(),
            shadow: true,
            props: vec!["first".into()],
            ..Default::default()
        };
        let getter = render_cmp_meta_getter(&meta).unwrap();
        let code = format!("export class MyCmp {{\n  {}\n}}\n", getter);
        let parsed = parse_component_metas(&code).unwrap();
        assert_eq!(parsed, vec![meta]);
        assert!(parse_component_metas("export const x = 1;").unwrap().is_empty());
    }

    #[test]
    fn relative_specifiers() {
        assert!(is_relative_specifier("./a"));
        assert!(is_relative_specifier("../a"));
        assert!(!is_relative_specifier("@kiln/core"));
        assert!(!is_relative_specifier("lodash"));
    }
}
