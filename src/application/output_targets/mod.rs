//! Output target fan-out
//!
//! One generator per distinct target kind in the config. Generators run in
//! parallel and only read the module map; each writes through the VFS write
//! buffer and reports one [`BuildOutput`] per configured target of its kind.
//! A failing or panicking generator turns into a diagnostic and never stops
//! its siblings.

mod collection;
mod custom_element;
mod hydrate;
mod lazy;

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::application::build::BuildContext;
use crate::application::compiler_ctx::CompilerContext;
use crate::domain::entities::{catch_error, panic_message, BuildOutput, Diagnostic};
use crate::domain::ports::{Bundler, Program};
use crate::domain::value_objects::{relative_to, OutputTarget, OutputTargetKind};
use crate::error::KilnResult;

pub use collection::CollectionGenerator;
pub use custom_element::CustomElementGenerator;
pub use hydrate::HydrateGenerator;
pub use lazy::LazyGenerator;

/// Everything a generator may read
pub struct OutputInput<'a> {
    pub ctx: &'a CompilerContext,
    pub program: &'a Arc<dyn Program>,
    pub bundler: &'a Arc<dyn Bundler>,
    pub build: &'a BuildContext,
}

/// What one generator produced
#[derive(Debug, Default)]
pub struct OutputReport {
    pub outputs: Vec<BuildOutput>,
    pub diagnostics: Vec<Diagnostic>,
}

impl OutputReport {
    pub fn record(&mut self, target: &OutputTarget, files: Vec<PathBuf>) {
        self.outputs.push(BuildOutput {
            target_type: target.kind(),
            dir: target.dir().to_path_buf(),
            files,
        });
    }
}

pub trait OutputGenerator: Send + Sync {
    fn kind(&self) -> OutputTargetKind;

    /// Generate for every configured target of this generator's kind
    fn generate(
        &self,
        input: &OutputInput<'_>,
        targets: &[&OutputTarget],
        report: &mut OutputReport,
    ) -> KilnResult<()>;
}

pub fn generator_for(kind: OutputTargetKind) -> Box<dyn OutputGenerator> {
    match kind {
        OutputTargetKind::Collection => Box::new(CollectionGenerator),
        OutputTargetKind::CustomElement => Box::new(CustomElementGenerator),
        OutputTargetKind::Lazy => Box::new(LazyGenerator),
        OutputTargetKind::Hydrate => Box::new(HydrateGenerator),
    }
}

/// Run every configured generator and merge their reports into the build
pub fn generate_outputs(
    ctx: &CompilerContext,
    program: &Arc<dyn Program>,
    bundler: &Arc<dyn Bundler>,
    build: &mut BuildContext,
) {
    let targets = ctx.config().output_targets.clone();
    let mut kinds: Vec<OutputTargetKind> = Vec::new();
    for target in &targets {
        if !kinds.contains(&target.kind()) {
            kinds.push(target.kind());
        }
    }
    if kinds.is_empty() {
        return;
    }

    let span = build.time_span(format!("generate outputs started, {} kinds", kinds.len()));
    let input = OutputInput {
        ctx,
        program,
        bundler,
        build: &*build,
    };
    let reports: Vec<OutputReport> = kinds
        .par_iter()
        .map(|kind| {
            let own: Vec<&OutputTarget> = targets.iter().filter(|t| t.kind() == *kind).collect();
            run_generator(generator_for(*kind).as_ref(), &input, &own)
        })
        .collect();

    let mut outputs: Vec<BuildOutput> = Vec::new();
    for report in reports {
        build.diagnostics.extend(report.diagnostics);
        outputs.extend(report.outputs);
    }
    for target in &targets {
        let found = outputs
            .iter()
            .position(|o| o.target_type == target.kind() && o.dir == target.dir());
        build.outputs.push(match found {
            Some(i) => outputs.swap_remove(i),
            None => BuildOutput {
                target_type: target.kind(),
                dir: target.dir().to_path_buf(),
                files: Vec::new(),
            },
        });
    }
    span.finish("generate outputs finished");
}

fn run_generator(
    generator: &dyn OutputGenerator,
    input: &OutputInput<'_>,
    targets: &[&OutputTarget],
) -> OutputReport {
    let kind = generator.kind();
    let mut report = OutputReport::default();
    let result = panic::catch_unwind(AssertUnwindSafe(|| generator.generate(input, targets, &mut report)));
    match result {
        Ok(Ok(())) => {
            debug!(target: "kiln::bundle", kind = %kind, outputs = report.outputs.len(), "output generated");
        }
        Ok(Err(err)) => {
            warn!(target: "kiln::bundle", kind = %kind, "output failed: {}", err);
            catch_error(&mut report.diagnostics, format!("{} output: {}", kind, err));
        }
        Err(payload) => {
            catch_error(
                &mut report.diagnostics,
                format!("{} output: {}", kind, panic_message(payload.as_ref())),
            );
        }
    }
    report
}

/// Path of an emitted module relative to the cache dir, e.g. `cmp/a.js`
pub(crate) fn emitted_relative(ctx: &CompilerContext, js_file: &Path) -> PathBuf {
    relative_to(js_file, &ctx.config().cache_dir)
        .or_else(|| js_file.file_name().map(PathBuf::from))
        .unwrap_or_default()
}
