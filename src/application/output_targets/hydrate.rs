//! Hydrate output: a single module that registers every component for hydration

use std::collections::BTreeMap;

use crate::application::build::transpile_transformers;
use crate::application::bundle::{bundle_output, plugin_pipeline, write_chunks, HYDRATE_ENTRY_ID};
use crate::domain::value_objects::{OutputTarget, OutputTargetKind};
use crate::error::KilnResult;

use super::{OutputGenerator, OutputInput, OutputReport};

pub const HYDRATE_ENTRY_NAME: &str = "hydrate";

pub struct HydrateGenerator;

impl OutputGenerator for HydrateGenerator {
    fn kind(&self) -> OutputTargetKind {
        OutputTargetKind::Hydrate
    }

    fn generate(
        &self,
        input: &OutputInput<'_>,
        targets: &[&OutputTarget],
        report: &mut OutputReport,
    ) -> KilnResult<()> {
        let ctx = input.ctx;
        let transformers = transpile_transformers(&ctx.config().core_import_path);
        let pipeline = plugin_pipeline(ctx, input.program, input.build, self.kind(), transformers)?;
        let entries = BTreeMap::from([(HYDRATE_ENTRY_NAME.to_string(), HYDRATE_ENTRY_ID.to_string())]);
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
