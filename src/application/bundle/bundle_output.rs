//! Running one bundle and writing its chunks
//!
//! Every bundled generator goes through here: the plugin chain is assembled
//! for the output kind, the bundle cache of the previous build is handed to
//! the bundler, and the generated chunks land in the VFS write buffer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::application::build::{BuildContext, BuildFeatures};
use crate::application::compiler_ctx::CompilerContext;
use crate::application::fs::WriteOptions;
use crate::domain::entities::{ComponentMeta, Diagnostic, DiagnosticCategory};
use crate::domain::ports::{
    BundleOutput, BundleRequest, Bundler, CustomTransformers, OutputOptions, PluginPipeline, Program,
};
use crate::domain::value_objects::OutputTargetKind;
use crate::error::KilnResult;

use super::plugins::{
    AppDataPlugin, ComponentEntry, HydratePlugin, LazyComponentPlugin, LazyCorePlugin,
    NodeResolvePlugin, ProgramTransformPlugin, SysPlugin, UserIndexPlugin,
};

/// Entry points handed to the bundler for every component
pub fn component_entries(components: &[ComponentMeta]) -> Vec<ComponentEntry> {
    components
        .iter()
        .map(|c| ComponentEntry {
            tag_name: c.tag_name.clone(),
            class_name: c.class_name.clone(),
            file: c.source_file_path.clone(),
            members: c.members(),
        })
        .collect()
}

/// Global scripts of the app followed by those of every collection
pub fn global_scripts(ctx: &CompilerContext) -> Vec<PathBuf> {
    ctx.config()
        .global_script
        .iter()
        .cloned()
        .chain(ctx.collections().into_iter().filter_map(|c| c.global_script))
        .collect()
}

/// Plugin chain for one output kind
pub fn plugin_pipeline(
    ctx: &CompilerContext,
    program: &Arc<dyn Program>,
    build: &BuildContext,
    kind: OutputTargetKind,
    transformers: CustomTransformers,
) -> KilnResult<PluginPipeline> {
    let config = ctx.config();
    let core = config.core_import_path.clone();
    let features = BuildFeatures::for_output(&build.components, kind, config.dev_mode);
    let entries = component_entries(&build.components);

    let mut pipeline = PluginPipeline::new().with(Arc::new(AppDataPlugin::new(
        features,
        config.namespace.clone(),
        global_scripts(ctx),
    )));
    match kind {
        OutputTargetKind::Lazy => {
            pipeline.push(Arc::new(LazyCorePlugin::new(core, &entries)?));
            pipeline.push(Arc::new(LazyComponentPlugin::new(&entries)));
        }
        OutputTargetKind::Hydrate => {
            pipeline.push(Arc::new(HydratePlugin::new(core, entries)));
        }
        OutputTargetKind::CustomElement | OutputTargetKind::Collection => {}
    }
    pipeline.push(Arc::new(UserIndexPlugin::new(ctx.fs(), &config.user_index_path())));
    pipeline.push(Arc::new(ProgramTransformPlugin::new(program.clone(), transformers)));
    pipeline.push(Arc::new(SysPlugin::new(ctx.fs().clone())));
    pipeline.push(Arc::new(NodeResolvePlugin::new(ctx.resolver().clone())));
    Ok(pipeline)
}

/// Bundle `input` and generate its chunks
///
/// The cache stored under `bundle_id` is reused and replaced. Bundler
/// warnings come back as diagnostics.
pub fn bundle_output(
    ctx: &CompilerContext,
    bundler: &dyn Bundler,
    bundle_id: &str,
    input: BTreeMap<String, String>,
    pipeline: PluginPipeline,
    diagnostics: &mut Vec<Diagnostic>,
) -> KilnResult<BundleOutput> {
    let request = BundleRequest {
        id: bundle_id.to_string(),
        input,
        pipeline,
        cache: ctx.bundle_cache(bundle_id),
    };
    let build = bundler.bundle(request)?;
    let output = build.generate(&OutputOptions {
        sourcemap: ctx.config().sourcemap,
    })?;
    ctx.set_bundle_cache(bundle_id, build.cache());

    diagnostics.extend(
        output
            .warnings
            .iter()
            .map(|w| Diagnostic::warn(DiagnosticCategory::Bundler, w.clone()).with_header(bundle_id)),
    );
    debug!(
        target: "kiln::bundle",
        bundle = bundle_id,
        bundler = bundler.name(),
        chunks = output.output.len(),
        "generated bundle"
    );
    Ok(output)
}

/// Write every chunk (and its map) under `dir`, returning the written paths
pub fn write_chunks(ctx: &CompilerContext, output: &BundleOutput, dir: &Path) -> KilnResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for chunk in &output.output {
        let path = dir.join(&chunk.file_name);
        ctx.fs().write_file(&path, &chunk.code, WriteOptions::default())?;
        files.push(path);

        if let Some(map) = &chunk.map {
            let map_path = dir.join(format!("{}.map", chunk.file_name));
            ctx.fs().write_file(&map_path, map, WriteOptions::default())?;
            files.push(map_path);
        }
    }
    Ok(files)
}
