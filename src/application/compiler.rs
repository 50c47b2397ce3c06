//! Compiler facade
//!
//! One `Compiler` owns one compiler context: the VFS, the event bus, the
//! module map and the bundle caches. `build` runs a single build cycle and
//! reuses the previous program, so calling it again only re-reads what
//! changed on the backing system. `create_watcher` hands out a watch
//! scheduler over the same context.

use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{validate_config, Config};
use crate::domain::entities::{BuildResults, Diagnostic, FsWatchResults};
use crate::domain::ports::{Bundler, CompilerSystem, FileWatchKind, Program, ProgramEngine};
use crate::domain::value_objects::resolve_path;
use crate::error::{KilnError, KilnResult};
use crate::infrastructure::{GraphBundler, ScriptEngine};

use super::build::{BuildRequest, BuildRunner};
use super::compiler_ctx::CompilerContext;
use super::events::{BuildEvents, CompilerEvent, CompilerEventName, Subscription};
use super::fs::InMemoryFileSystem;
use super::program_host::{create_program, program_options};
use super::watch::{WatchPhase, Watcher, WatcherHandle};

pub struct Compiler {
    ctx: Arc<CompilerContext>,
    engine: Arc<dyn ProgramEngine>,
    bundler: Arc<dyn Bundler>,
    config_diagnostics: Vec<Diagnostic>,
    previous: Mutex<Option<Arc<dyn Program>>>,
    watcher: Mutex<Option<WatcherHandle>>,
}

impl Compiler {
    /// Validate `config` against the system's working directory
    ///
    /// Error diagnostics from validation refuse the config; warnings are kept
    /// and available from [`Compiler::config_diagnostics`].
    pub fn new(config: Config, sys: Arc<dyn CompilerSystem>) -> KilnResult<Self> {
        let (config, diagnostics) = validate_config(config, &sys.current_directory());

        let errors: Vec<&str> = diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| d.message.as_str())
            .collect();
        if !errors.is_empty() {
            return Err(KilnError::InvalidConfig(errors.join("; ")));
        }
        for diagnostic in &diagnostics {
            warn!(target: "kiln::config", "{}", diagnostic.message);
        }

        info!(
            target: "kiln::build",
            system = sys.name(),
            root = %config.root_dir.display(),
            "compiler created"
        );
        let fs = Arc::new(InMemoryFileSystem::new(sys));
        let ctx = Arc::new(CompilerContext::new(config, fs, BuildEvents::new()));

        Ok(Self {
            ctx,
            engine: Arc::new(ScriptEngine::new()),
            bundler: Arc::new(GraphBundler::new()),
            config_diagnostics: diagnostics,
            previous: Mutex::new(None),
            watcher: Mutex::new(None),
        })
    }

    pub fn with_engine(mut self, engine: Arc<dyn ProgramEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = bundler;
        self
    }

    fn runner(&self) -> BuildRunner {
        BuildRunner::new(self.ctx.clone(), self.bundler.clone())
    }

    /// Run one build cycle
    ///
    /// The first call is a full build; later calls are incremental against
    /// the last program whose build was not aborted and finish as no-change
    /// when nothing moved.
    pub fn build(&self) -> Arc<BuildResults> {
        // a one-shot build has no watcher invalidating the cache for it
        self.ctx.fs().clear_cache();

        let runner = self.runner();
        let config = self.ctx.config().clone();
        let baseline = self.previous.lock().clone();
        let request = if baseline.is_some() {
            BuildRequest::rebuild(FsWatchResults::default())
        } else {
            BuildRequest::full()
        };

        let program = create_program(
            self.engine.as_ref(),
            config.program_config.as_deref(),
            &program_options(&config),
            self.ctx.fs().as_ref(),
            baseline.as_ref(),
        );
        match program {
            Ok(program) => {
                let results = runner.run(&program, request);
                if !results.aborted {
                    *self.previous.lock() = Some(program);
                }
                results
            }
            Err(err) => {
                warn!(target: "kiln::build", "program creation failed: {}", err);
                runner.fail(&request, err)
            }
        }
    }

    /// A watch scheduler over this compiler's context; `start` blocks
    pub fn create_watcher(&self) -> Watcher {
        let watcher = Watcher::new(
            self.ctx.clone(),
            Arc::new(self.runner()),
            self.engine.clone(),
        );
        *self.watcher.lock() = Some(watcher.handle());
        watcher
    }

    /// Close any watcher, drop all cached state and detach every handler
    pub fn destroy(&self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.close(0);
        }
        self.previous.lock().take();
        self.ctx.reset();
        self.ctx.fs().clear_cache();
        self.ctx.events().unsubscribe_all();
        debug!(target: "kiln::build", "compiler destroyed");
    }

    pub fn on<F>(&self, name: CompilerEventName, handler: F) -> Subscription
    where
        F: Fn(&CompilerEvent) + Send + Sync + 'static,
    {
        self.ctx.events().subscribe(name, handler)
    }

    pub fn on_any<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&CompilerEvent) + Send + Sync + 'static,
    {
        self.ctx.events().subscribe_all(handler)
    }

    pub fn once(&self, name: CompilerEventName) -> Receiver<CompilerEvent> {
        self.ctx.events().once(name)
    }

    /// Report a change by hand
    ///
    /// With a live watcher the change joins its pending window. Otherwise the
    /// cached entry is dropped and the events go straight to the bus.
    pub fn trigger(&self, kind: FileWatchKind, path: &Path) {
        let path = resolve_path(&self.ctx.config().root_dir, path);
        let handle = self
            .watcher
            .lock()
            .clone()
            .filter(|h| h.phase() != WatchPhase::Closed);

        match handle {
            Some(handle) => handle.notify(kind, &path),
            None => {
                self.ctx.fs().clear_file_cache(&path);
                self.ctx.events().emit(&CompilerEvent::fs_change(kind, &path));
                self.ctx.events().emit(&CompilerEvent::file_event(kind, &path));
            }
        }
    }

    pub fn fs(&self) -> &Arc<InMemoryFileSystem> {
        self.ctx.fs()
    }

    pub fn context(&self) -> &Arc<CompilerContext> {
        &self.ctx
    }

    pub fn config(&self) -> &Arc<Config> {
        self.ctx.config()
    }

    pub fn config_diagnostics(&self) -> &[Diagnostic] {
        &self.config_diagnostics
    }

    pub fn last_build_results(&self) -> Option<Arc<BuildResults>> {
        self.ctx.last_build_results()
    }
}
