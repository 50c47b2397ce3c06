//! `components.d.ts`, the generated public type surface of the app

use crate::application::compiler_ctx::CompilerContext;
use crate::application::fs::WriteOptions;
use crate::domain::entities::{ComponentMeta, Diagnostic, DiagnosticCategory};

use super::build_ctx::BuildContext;

const HEADER: &str = "/* eslint-disable */\n/* This file is generated by kiln, edits are overwritten. */\n";

/// Regenerate the declaration file and record whether it changed
pub fn generate_app_types(ctx: &CompilerContext, build: &mut BuildContext) {
    let app: Vec<&ComponentMeta> = build
        .components
        .iter()
        .filter(|c| {
            ctx.get_module(&c.source_file_path)
                .is_some_and(|m| !m.is_collection_dependency)
        })
        .collect();
    let content = render_app_types(&app);
    let path = ctx.config().app_types_path();

    match ctx.fs().write_file(&path, &content, WriteOptions::default()) {
        Ok(result) => build.types_changed = result.changed_content,
        Err(err) => build.diagnostics.push(
            Diagnostic::error(DiagnosticCategory::Internal, err.to_string()).with_file(&path),
        ),
    }
}

pub fn render_app_types(components: &[&ComponentMeta]) -> String {
    let mut out = String::from(HEADER);

    out.push_str("export namespace Components {\n");
    for cmp in components {
        out.push_str(&format!("  interface {} {{\n", cmp.pascal_tag()));
        for prop in &cmp.props {
            out.push_str(&format!("    \"{}\"?: any;\n", prop));
        }
        for method in &cmp.methods {
            out.push_str(&format!("    \"{}\": (...args: any[]) => Promise<any>;\n", method));
        }
        out.push_str("  }\n");
    }
    out.push_str("}\n");

    out.push_str("declare global {\n");
    for cmp in components {
        let name = cmp.pascal_tag();
        out.push_str(&format!(
            "  interface HTML{0}Element extends Components.{0}, HTMLElement {{}}\n",
            name
        ));
    }
    out.push_str("  interface HTMLElementTagNameMap {\n");
    for cmp in components {
        out.push_str(&format!(
            "    \"{}\": HTML{}Element;\n",
            cmp.tag_name,
            cmp.pascal_tag()
        ));
    }
    out.push_str("  }\n}\n");
    out
}
