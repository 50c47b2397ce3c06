//! Custom element output: one self-defining bundle per component module

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use crate::application::build::{transpile_transformers, NativeComponent};
use crate::application::bundle::{bundle_output, plugin_pipeline, write_chunks};
use crate::domain::entities::ModuleMeta;
use crate::domain::value_objects::{relative_to, OutputTarget, OutputTargetKind};
use crate::error::KilnResult;

use super::{OutputGenerator, OutputInput, OutputReport};

pub struct CustomElementGenerator;

impl OutputGenerator for CustomElementGenerator {
    fn kind(&self) -> OutputTargetKind {
        OutputTargetKind::CustomElement
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
            .filter(|m| !m.is_collection_dependency && m.has_components())
            .collect();
        let entries = entry_points(&modules, &ctx.config().src_dir);
        if entries.is_empty() {
            for target in targets {
                report.record(target, Vec::new());
            }
            return Ok(());
        }

        let core = &ctx.config().core_import_path;
        let transformers =
            transpile_transformers(core).after(Arc::new(NativeComponent::new(core.clone())));
        let pipeline = plugin_pipeline(ctx, input.program, input.build, self.kind(), transformers)?;
        let output = bundle_output(
            ctx,
            input.bundler.as_ref(),
            self.kind().as_str(),
            entries,
            pipeline,
            &mut report.diagnostics,
        )?;

        for target in targets {
            let files = write_chunks(ctx, &output, target.dir())?;
            report.record(target, files);
        }
        Ok(())
    }
}

/// `{ file stem: source path }`; stems that collide keep their path under src
///
/// Keys are unique: a path key that lands on a key already taken gets a
/// numeric suffix.
fn entry_points(modules: &[ModuleMeta], src_dir: &Path) -> BTreeMap<String, String> {
    let mut stem_counts: HashMap<OsString, usize> = HashMap::new();
    for module in modules {
        if let Some(stem) = module.source_file_path.file_stem() {
            *stem_counts.entry(stem.to_os_string()).or_default() += 1;
        }
    }

    let (unique, colliding): (Vec<&ModuleMeta>, Vec<&ModuleMeta>) = modules
        .iter()
        .filter(|m| m.source_file_path.file_stem().is_some())
        .partition(|m| {
            m.source_file_path
                .file_stem()
                .is_some_and(|stem| stem_counts.get(stem) == Some(&1))
        });

    let mut entries = BTreeMap::new();
    for module in unique {
        let path = &module.source_file_path;
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        insert_entry(&mut entries, stem, path);
    }
    for module in colliding {
        let path = &module.source_file_path;
        let key = match relative_to(&path.with_extension(""), src_dir) {
            Some(rel) => rel.to_string_lossy().replace(['/', '\\'], "-"),
            None => path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
        };
        insert_entry(&mut entries, key, path);
    }
    entries
}

fn insert_entry(entries: &mut BTreeMap<String, String>, key: String, source: &Path) {
    let mut candidate = key.clone();
    let mut n = 2;
    while entries.contains_key(&candidate) {
        candidate = format!("{}-{}", key, n);
        n += 1;
    }
    entries.insert(candidate, source.to_string_lossy().into_owned());
}
