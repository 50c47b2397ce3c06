//! Transpile phase: emit changed modules into the VFS write buffer

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::application::compiler_ctx::CompilerContext;
use crate::application::fs::WriteOptions;
use crate::domain::entities::{Diagnostic, DiagnosticCategory};
use crate::domain::ports::Program;

use super::build_ctx::BuildContext;
use super::transforms::transpile_transformers;

/// Emit every file a full build needs, or the affected files of a rebuild
///
/// Emitted JS is buffered in the VFS. Syntactic diagnostics of the whole
/// program land in the build; other emit diagnostics follow them.
pub fn transpile(ctx: &CompilerContext, program: &Arc<dyn Program>, build: &mut BuildContext) {
    let span = build.time_span("transpile started");

    let targets: Vec<PathBuf> = if build.requires_full_build {
        program.root_files()
    } else {
        program.affected_files()
    };
    let transformers = transpile_transformers(&ctx.config().core_import_path);

    build.diagnostics.extend(program.syntactic_diagnostics());

    let mut write_errors: Vec<Diagnostic> = Vec::new();
    for target in &targets {
        let mut write = |path: &Path, text: &str| {
            if let Err(err) = ctx.fs().write_file(path, text, WriteOptions::default()) {
                write_errors.push(
                    Diagnostic::error(DiagnosticCategory::Internal, err.to_string()).with_file(path),
                );
            }
        };
        let result = program.emit(Some(target), &transformers, &mut write, false);
        build.diagnostics.extend(
            result
                .diagnostics
                .into_iter()
                .filter(|d| d.category != DiagnosticCategory::Syntax),
        );
        build.transpiled.extend(result.emitted);
    }
    build.diagnostics.append(&mut write_errors);

    debug!(
        target: "kiln::build",
        build_id = build.build_id,
        targets = targets.len(),
        emitted = build.transpiled.len(),
        "transpiled"
    );
    span.finish(format!("transpile finished, {} modules", build.transpiled.len()));
}
