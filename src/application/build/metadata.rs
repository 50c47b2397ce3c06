//! Metadata phase: module map updates and component dependency edges

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::application::compiler_ctx::CompilerContext;
use crate::domain::entities::{ComponentMeta, Diagnostic, DiagnosticCategory, ModuleMeta};
use crate::domain::ports::Program;
use crate::domain::services::{
    import_specifiers, is_relative_specifier, parse_component_metas, tag_references,
};

use super::build_ctx::BuildContext;

/// Replace the module map entry of every transpiled file and drop entries
/// whose source left the program
pub fn update_module_map(ctx: &CompilerContext, program: &Arc<dyn Program>, build: &mut BuildContext) {
    let span = build.time_span("metadata started");
    let resolver = program.type_resolver();

    for source in build.transpiled.clone() {
        let js_path = js_path_for(ctx, &source);
        let Some(code) = ctx.fs().read_file(&js_path) else {
            build.diagnostics.push(
                Diagnostic::error(DiagnosticCategory::Internal, "emitted module is missing")
                    .with_file(&js_path),
            );
            continue;
        };

        let components = match parse_component_metas(&code) {
            Ok(list) => list,
            Err(err) => {
                build.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCategory::Internal,
                        format!("invalid component metadata: {}", err),
                    )
                    .with_file(&source),
                );
                Vec::new()
            }
        };

        let mut imports = Vec::new();
        let mut external_imports = Vec::new();
        for spec in import_specifiers(&code) {
            let resolved = is_relative_specifier(&spec)
                .then(|| resolver.resolve_module(&source, &spec))
                .flatten();
            match resolved {
                Some(path) => imports.push(path),
                None => external_imports.push(spec),
            }
        }

        ctx.set_module(ModuleMeta {
            components: components
                .into_iter()
                .map(|mut c| {
                    c.source_file_path = source.clone();
                    c
                })
                .collect(),
            source_file_path: source.clone(),
            js_file_path: js_path,
            imports,
            external_imports,
            tag_refs: tag_references(&code),
            collection_name: None,
            is_collection_dependency: false,
        });
    }

    for stale in ctx
        .modules()
        .into_iter()
        .filter(|m| !m.is_collection_dependency && program.source_file(&m.source_file_path).is_none())
    {
        ctx.remove_module(&stale.source_file_path);
        if let Err(err) = ctx.fs().remove_file(&stale.js_file_path) {
            build.diagnostics.push(
                Diagnostic::warn(DiagnosticCategory::Internal, err.to_string())
                    .with_file(&stale.js_file_path),
            );
        }
        debug!(target: "kiln::build", path = %stale.source_file_path.display(), "removed module");
    }

    span.finish("metadata finished");
}

fn js_path_for(ctx: &CompilerContext, source: &Path) -> PathBuf {
    let config = ctx.config();
    let rel = source
        .strip_prefix(&config.src_dir)
        .or_else(|_| source.strip_prefix(&config.root_dir))
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| source.file_name().map(PathBuf::from).unwrap_or_default());
    config.cache_dir.join(rel).with_extension("js")
}

/// Fill in dependency fields and the component graph from the module map
///
/// A tag declared by two different modules is an error; the later module
/// in path order loses.
pub fn resolve_component_dependencies(ctx: &CompilerContext, build: &mut BuildContext) {
    let modules = ctx.modules();

    let mut owners: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut refs_by_tag: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut components: Vec<ComponentMeta> = Vec::new();
    for module in &modules {
        for cmp in &module.components {
            if let Some(first) = owners.get(&cmp.tag_name) {
                build.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCategory::Type,
                        format!(
                            "component tag name '{}' is already used by {}",
                            cmp.tag_name,
                            first.display()
                        ),
                    )
                    .with_header("Component Tag Name Must Be Unique")
                    .with_file(&module.source_file_path),
                );
                continue;
            }
            owners.insert(cmp.tag_name.clone(), module.source_file_path.clone());
            refs_by_tag.insert(cmp.tag_name.clone(), module.tag_refs.clone());
            components.push(cmp.clone());
        }
    }

    let direct: BTreeMap<String, Vec<String>> = refs_by_tag
        .iter()
        .map(|(tag, refs)| {
            let deps = refs
                .iter()
                .filter(|r| *r != tag && owners.contains_key(*r))
                .cloned()
                .collect();
            (tag.clone(), deps)
        })
        .collect();

    let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for tag in direct.keys() {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&String> = direct[tag].iter().collect();
        while let Some(next) = stack.pop() {
            if next == tag || !seen.insert(next.clone()) {
                continue;
            }
            if let Some(more) = direct.get(next) {
                stack.extend(more.iter());
            }
        }
        graph.insert(tag.clone(), seen.into_iter().collect());
    }

    for cmp in &mut components {
        cmp.direct_dependencies = direct.get(&cmp.tag_name).cloned().unwrap_or_default();
        cmp.dependencies = graph.get(&cmp.tag_name).cloned().unwrap_or_default();
        cmp.dependents = graph
            .iter()
            .filter(|(_, deps)| deps.contains(&cmp.tag_name))
            .map(|(tag, _)| tag.clone())
            .collect();
    }
    components.sort_by(|a, b| a.tag_name.cmp(&b.tag_name));

    build.components = components;
    build.component_graph = graph;
}
