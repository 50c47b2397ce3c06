//! Collection output: the app's emitted modules plus a manifest other apps import

use std::path::{Path, PathBuf};

use crate::application::fs::WriteOptions;
use crate::domain::entities::{
    CollectionComponent, CollectionManifest, CompilerInfo, Diagnostic, DiagnosticCategory, ModuleMeta,
};
use crate::domain::ports::CustomTransformers;
use crate::domain::value_objects::{relative_to, OutputTarget, OutputTargetKind};
use crate::error::KilnResult;

use super::{emitted_relative, OutputGenerator, OutputInput, OutputReport};

pub const COLLECTION_MANIFEST_FILE: &str = "collection-manifest.json";

pub struct CollectionGenerator;

impl OutputGenerator for CollectionGenerator {
    fn kind(&self) -> OutputTargetKind {
        OutputTargetKind::Collection
    }

    fn generate(
        &self,
        input: &OutputInput<'_>,
        targets: &[&OutputTarget],
        report: &mut OutputReport,
    ) -> KilnResult<()> {
        let ctx = input.ctx;
        let modules: Vec<ModuleMeta> = ctx
            .modules()
            .into_iter()
            .filter(|m| !m.is_collection_dependency)
            .collect();
        let manifest = collection_manifest(input, &modules);
        let manifest_json = serde_json::to_string_pretty(&manifest)?;

        for target in targets {
            let dir = target.dir();
            let mut files = Vec::new();

            for module in &modules {
                let Some(code) = ctx.fs().read_file(&module.js_file_path) else {
                    report.diagnostics.push(
                        Diagnostic::warn(DiagnosticCategory::Internal, "emitted module is missing")
                            .with_file(&module.js_file_path),
                    );
                    continue;
                };
                let path = dir.join(emitted_relative(ctx, &module.js_file_path));
                ctx.fs().write_file(&path, &code, WriteOptions::default())?;
                files.push(path);
            }

            files.extend(write_declarations(input, &modules, dir, &mut report.diagnostics)?);

            let manifest_path = dir.join(COLLECTION_MANIFEST_FILE);
            ctx.fs().write_file(&manifest_path, &manifest_json, WriteOptions::default())?;
            files.push(manifest_path);

            report.record(target, files);
        }
        Ok(())
    }
}

/// Entries and components keyed by their file relative to the collection dir
fn collection_manifest(input: &OutputInput<'_>, modules: &[ModuleMeta]) -> CollectionManifest {
    let ctx = input.ctx;
    let rel = |m: &ModuleMeta| manifest_path_string(&emitted_relative(ctx, &m.js_file_path));

    let components = input
        .build
        .components
        .iter()
        .filter_map(|cmp| {
            let module = modules.iter().find(|m| m.source_file_path == cmp.source_file_path)?;
            Some(CollectionComponent {
                meta: cmp.clone(),
                file: rel(module),
            })
        })
        .collect();

    let global_script = ctx.config().global_script.as_ref().and_then(|script| {
        modules
            .iter()
            .find(|m| &m.source_file_path == script)
            .map(|m| rel(m))
    });

    CollectionManifest {
        entries: modules.iter().filter(|m| m.has_components()).map(|m| rel(m)).collect(),
        components,
        compiler: CompilerInfo::current(),
        global_script,
    }
}

/// Declaration stubs under `<dir>/types/`
fn write_declarations(
    input: &OutputInput<'_>,
    modules: &[ModuleMeta],
    dir: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) -> KilnResult<Vec<PathBuf>> {
    let ctx = input.ctx;
    let cache_dir = &ctx.config().cache_dir;
    let types_dir = dir.join("types");
    let mut pending: Vec<(PathBuf, String)> = Vec::new();

    for module in modules {
        let mut write = |path: &Path, text: &str| {
            let rel = relative_to(path, cache_dir)
                .or_else(|| path.file_name().map(PathBuf::from))
                .unwrap_or_default();
            pending.push((types_dir.join(rel), text.to_string()));
        };
        let result = input.program.emit(
            Some(&module.source_file_path),
            &CustomTransformers::new(),
            &mut write,
            true,
        );
        diagnostics.extend(result.diagnostics.into_iter().filter(|d| !d.is_error()));
    }

    let mut files = Vec::with_capacity(pending.len());
    for (path, text) in pending {
        ctx.fs().write_file(&path, &text, WriteOptions::default())?;
        files.push(path);
    }
    Ok(files)
}

fn manifest_path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
