//! Build runner
//!
//! One pass over a program: start, transpile, metadata, dependency
//! resolution, app types, output fan-out, finish. Every pass ends with
//! exactly one `buildFinish` or `buildNoChange`; failures inside a phase
//! (errors or panics) end up as diagnostics on the results instead of
//! escaping to the caller.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{info, warn};

use crate::application::compiler_ctx::CompilerContext;
use crate::application::events::CompilerEvent;
use crate::application::output_targets::generate_outputs;
use crate::domain::entities::{catch_error, panic_message, BuildResults, FsWatchResults};
use crate::domain::ports::{Bundler, Program};

use super::app_types::generate_app_types;
use super::build_ctx::{BuildContext, BuildRequest};
use super::changes::collect_changes;
use super::metadata::{resolve_component_dependencies, update_module_map};
use super::transpile::transpile;

pub struct BuildRunner {
    ctx: Arc<CompilerContext>,
    bundler: Arc<dyn Bundler>,
}

impl BuildRunner {
    pub fn new(ctx: Arc<CompilerContext>, bundler: Arc<dyn Bundler>) -> Self {
        Self { ctx, bundler }
    }

    pub fn context(&self) -> &Arc<CompilerContext> {
        &self.ctx
    }

    /// Run one build of `program`
    pub fn run(&self, program: &Arc<dyn Program>, request: BuildRequest) -> Arc<BuildResults> {
        let changes = panic::catch_unwind(AssertUnwindSafe(|| {
            collect_changes(&request.changes, program.as_ref())
        }));
        let changes = match changes {
            Ok(changes) => changes,
            Err(payload) => return self.fail(&request, panic_message(payload.as_ref())),
        };
        let mut build = self.start(&request, changes);

        if build.is_no_change() {
            info!(target: "kiln::build", build_id = build.build_id, "no changes, build skipped");
            return self.publish(build.finish(true));
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_phases(program, &mut build)));
        if let Err(payload) = outcome {
            catch_error(&mut build.diagnostics, panic_message(payload.as_ref()));
            build.abort("panic");
        }

        self.finish(program, build)
    }

    /// Publish a failed build for a program that could not be created or read
    pub fn fail(&self, request: &BuildRequest, err: impl fmt::Display) -> Arc<BuildResults> {
        let mut build = self.start(request, request.changes.clone());
        catch_error(&mut build.diagnostics, err);
        build.abort("program");
        self.publish(build.finish(false))
    }

    fn start(&self, request: &BuildRequest, changes: FsWatchResults) -> BuildContext {
        let build = BuildContext::new(
            self.ctx.next_build_id(),
            request,
            changes,
            self.ctx.config(),
            self.ctx.events().clone(),
        );
        info!(
            target: "kiln::build",
            build_id = build.build_id,
            is_rebuild = build.is_rebuild,
            changed = build.changes.files_changed().len(),
            "build started"
        );
        self.ctx.events().emit(&CompilerEvent::BuildStart {
            build_id: build.build_id,
            is_rebuild: build.is_rebuild,
        });
        build
    }

    fn run_phases(&self, program: &Arc<dyn Program>, build: &mut BuildContext) {
        let ctx = self.ctx.as_ref();

        if build.requires_full_build {
            let (collections, modules) = ctx.resolver().load_collections();
            ctx.set_collections(collections, modules);
        } else if build.summary.has_structure_changes() {
            ctx.resolver().clear_cache();
        }

        transpile(ctx, program, build);
        if build.has_error() {
            build.abort("transpile");
            return;
        }

        update_module_map(ctx, program, build);
        resolve_component_dependencies(ctx, build);
        if build.has_error() {
            build.abort("metadata");
            return;
        }

        generate_app_types(ctx, build);
        if build.is_rebuild && build.types_changed && ctx.config().types_short_circuit {
            info!(target: "kiln::build", build_id = build.build_id, "public types changed, outputs skipped");
            return;
        }

        generate_outputs(ctx, program, &self.bundler, build);
    }

    fn finish(&self, program: &Arc<dyn Program>, mut build: BuildContext) -> Arc<BuildResults> {
        let span = build.time_span("commit started");
        match panic::catch_unwind(AssertUnwindSafe(|| self.ctx.fs().commit())) {
            Ok(Ok(entries)) => {
                let changed = entries.iter().filter(|e| e.changed).count();
                span.finish(format!("commit finished, {} of {} files changed", changed, entries.len()));
            }
            Ok(Err(err)) => {
                warn!(target: "kiln::build", build_id = build.build_id, "commit failed: {}", err);
                catch_error(&mut build.diagnostics, err);
            }
            Err(payload) => {
                warn!(target: "kiln::build", build_id = build.build_id, "commit panicked");
                catch_error(&mut build.diagnostics, panic_message(payload.as_ref()));
            }
        }

        if self.ctx.config().validate_types && !build.aborted {
            let span = build.time_span("validate types started");
            match panic::catch_unwind(AssertUnwindSafe(|| program.semantic_diagnostics())) {
                Ok(diagnostics) => build.diagnostics.extend(diagnostics),
                Err(payload) => catch_error(&mut build.diagnostics, panic_message(payload.as_ref())),
            }
            span.finish("validate types finished");
        }

        self.publish(build.finish(false))
    }

    fn publish(&self, results: BuildResults) -> Arc<BuildResults> {
        let results = Arc::new(results);
        info!(
            target: "kiln::build",
            build_id = results.build_id,
            has_error = results.has_error,
            duration_ms = results.duration_ms,
            "build finished"
        );
        self.ctx.set_last_build_results(results.clone());
        let event = if results.no_change {
            CompilerEvent::BuildNoChange {
                results: results.clone(),
            }
        } else {
            CompilerEvent::BuildFinish {
                results: results.clone(),
            }
        };
        self.ctx.events().emit(&event);
        results
    }
}
