//! Lazy output: a small loader plus one bundle per component, fetched on first use

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::build::{transpile_transformers, LazyComponent};
use crate::application::bundle::{
    bundle_output, component_entries, plugin_pipeline, write_chunks, LAZY_BROWSER_ID,
    LAZY_EXTERNAL_ID, USER_INDEX_ID,
};
use crate::domain::entities::ComponentMeta;
use crate::domain::value_objects::{OutputTarget, OutputTargetKind};
use crate::error::KilnResult;

use super::{OutputGenerator, OutputInput, OutputReport};

pub struct LazyGenerator;

impl OutputGenerator for LazyGenerator {
    fn kind(&self) -> OutputTargetKind {
        OutputTargetKind::Lazy
    }

    fn generate(
        &self,
        input: &OutputInput<'_>,
        targets: &[&OutputTarget],
        report: &mut OutputReport,
    ) -> KilnResult<()> {
        let ctx = input.ctx;
        let config = ctx.config();
        let entries = lazy_entries(&config.fs_namespace(), &input.build.components);

        let transformers = transpile_transformers(&config.core_import_path)
            .after(Arc::new(LazyComponent::new(config.core_import_path.clone())));
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

fn lazy_entries(fs_namespace: &str, components: &[ComponentMeta]) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    entries.insert(fs_namespace.to_string(), LAZY_BROWSER_ID.to_string());
    entries.insert("loader".to_string(), LAZY_EXTERNAL_ID.to_string());
    entries.insert("index".to_string(), USER_INDEX_ID.to_string());
    for entry in component_entries(components) {
        entries.insert(entry.bundle_key(), entry.entry_id());
    }
    entries
}
