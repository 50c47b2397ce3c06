//! Source transforms plugged into program emit
//!
//! `before` transforms see the module as written, `after` transforms see
//! the lowered JS.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::domain::entities::{Diagnostic, DiagnosticCategory};
use crate::domain::ports::{CustomTransformers, SourceFile, SourceTransform};
use crate::domain::services::{decorators_to_static, parse_component_metas};

/// Specifier user code imports the runtime from
pub const CORE_SPECIFIER: &str = "@kiln/core";

lazy_static! {
    static ref CORE_IMPORT_RE: Regex = Regex::new(r#"(['"])@kiln/core['"]"#).unwrap();
}

/// `@Component` and member decorators become static getters
pub struct DecoratorsToStatic;

impl SourceTransform for DecoratorsToStatic {
    fn name(&self) -> &'static str {
        "decorators-to-static"
    }

    fn transform(&self, file: &SourceFile, code: String, diagnostics: &mut Vec<Diagnostic>) -> String {
        match decorators_to_static(&code) {
            Ok(out) => out,
            Err(err) => {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCategory::Internal,
                        format!("could not serialize component metadata: {}", err),
                    )
                    .with_file(&file.path),
                );
                code
            }
        }
    }
}

/// Point `@kiln/core` imports at the configured runtime
pub struct UpdateCoreImports {
    path: String,
}

impl UpdateCoreImports {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceTransform for UpdateCoreImports {
    fn name(&self) -> &'static str {
        "update-core-imports"
    }

    fn transform(&self, _file: &SourceFile, code: String, _: &mut Vec<Diagnostic>) -> String {
        if !CORE_IMPORT_RE.is_match(&code) {
            return code;
        }
        let replacement = format!("${{1}}{}${{1}}", self.path);
        CORE_IMPORT_RE
            .replace_all(&code, replacement.as_str())
            .into_owned()
    }
}

/// Self-registering custom element modules
pub struct NativeComponent {
    core_path: String,
}

impl NativeComponent {
    pub fn new(core_path: impl Into<String>) -> Self {
        Self {
            core_path: core_path.into(),
        }
    }
}

impl SourceTransform for NativeComponent {
    fn name(&self) -> &'static str {
        "native-component"
    }

    fn transform(&self, file: &SourceFile, code: String, diagnostics: &mut Vec<Diagnostic>) -> String {
        register_components(file, code, diagnostics, |code, metas| {
            let mut out = format!(
                "import {{ proxyCustomElement }} from '{}';\n{}\n",
                self.core_path,
                code.trim_end()
            );
            for meta in metas {
                out.push_str(&format!(
                    "customElements.define('{}', proxyCustomElement({}));\n",
                    meta.tag_name, meta.class_name
                ));
            }
            out
        })
    }
}

/// Components that register an instance with the lazy loader
pub struct LazyComponent {
    core_path: String,
}

impl LazyComponent {
    pub fn new(core_path: impl Into<String>) -> Self {
        Self {
            core_path: core_path.into(),
        }
    }
}

impl SourceTransform for LazyComponent {
    fn name(&self) -> &'static str {
        "lazy-component"
    }

    fn transform(&self, file: &SourceFile, code: String, diagnostics: &mut Vec<Diagnostic>) -> String {
        register_components(file, code, diagnostics, |code, metas| {
            let mut out = format!(
                "import {{ registerInstance }} from '{}';\n{}\n",
                self.core_path,
                code.trim_end()
            );
            for meta in metas {
                out.push_str(&format!(
                    "registerInstance({}, '{}');\n",
                    meta.class_name, meta.tag_name
                ));
            }
            out
        })
    }
}

fn register_components<F>(
    file: &SourceFile,
    code: String,
    diagnostics: &mut Vec<Diagnostic>,
    render: F,
) -> String
where
    F: FnOnce(&str, &[crate::domain::entities::ComponentMeta]) -> String,
{
    match parse_component_metas(&code) {
        Ok(metas) if metas.is_empty() => code,
        Ok(metas) => render(&code, &metas),
        Err(err) => {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCategory::Internal,
                    format!("invalid component metadata: {}", err),
                )
                .with_file(&file.path),
            );
            code
        }
    }
}

/// Transforms every transpile runs
pub fn transpile_transformers(core_import_path: &str) -> CustomTransformers {
    CustomTransformers::new()
        .before(Arc::new(DecoratorsToStatic))
        .before(Arc::new(UpdateCoreImports::new(core_import_path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(text: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from("/app/src/cmp.tsx"),
            text: Arc::from(text),
            version: String::new(),
        }
    }

    const CMP: &str = r#"import { Component, Prop } from '@kiln/core';

@Component({ tag: 'my-cmp' })
export class MyCmp {
  @Prop() first: string;
}
"#;

    #[test]
    fn test_core_imports_are_rewritten() {
        let t = UpdateCoreImports::new("@kiln/core/internal/client");
        let mut diags = Vec::new();
        let out = t.transform(
            &file(""),
            "import { h } from '@kiln/core';\nimport x from '@kiln/core/other';\n".into(),
            &mut diags,
        );
        assert_eq!(
            out,
            "import { h } from '@kiln/core/internal/client';\nimport x from '@kiln/core/other';\n"
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_native_component_registers_each_tag() {
        let mut diags = Vec::new();
        let code = DecoratorsToStatic.transform(&file(CMP), CMP.to_string(), &mut diags);
        let out = NativeComponent::new("@kiln/core/internal/client").transform(
            &file(CMP),
            code,
            &mut diags,
        );
        assert!(diags.is_empty());
        assert!(out.starts_with("import { proxyCustomElement } from '@kiln/core/internal/client';\n"));
        assert!(out.ends_with("customElements.define('my-cmp', proxyCustomElement(MyCmp));\n"));
    }

    #[test]
    fn test_lazy_component_leaves_plain_modules_alone() {
        let mut diags = Vec::new();
        let code = "export const x = 1;\n".to_string();
        let out = LazyComponent::new("rt").transform(&file(""), code.clone(), &mut diags);
        assert_eq!(out, code);
    }

    #[test]
    fn test_transpile_transformers_order() {
        let t = transpile_transformers("rt");
        let names: Vec<&str> = t.before.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["decorators-to-static", "update-core-imports"]);
        assert!(t.after.is_empty());
    }
}
