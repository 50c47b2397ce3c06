//! Program host wiring
//!
//! The VFS is the [`ProgramHost`](crate::domain::ports::ProgramHost): every
//! read the program engine makes goes through it, so memory-backed and
//! disk-backed builds see the same files. `WatchProgram` keeps the last
//! accepted program around so each update is incremental against it.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::entities::panic_message;
use crate::domain::ports::{Program, ProgramEngine, ProgramHost, ProgramOptions};
use crate::domain::value_objects::relative_to;
use crate::error::{KilnError, KilnResult};

use super::fs::{InMemoryFileSystem, WriteOptions};

/// Called synchronously with every program `WatchProgram::update` creates;
/// returning false keeps the program out of the baseline
pub type AfterProgramCreate = Box<dyn Fn(&Arc<dyn Program>) -> bool + Send + Sync>;

/// Create a program, turning an engine panic into a program error
pub fn create_program(
    engine: &dyn ProgramEngine,
    config_path: Option<&Path>,
    options: &ProgramOptions,
    host: &dyn ProgramHost,
    previous: Option<&Arc<dyn Program>>,
) -> KilnResult<Arc<dyn Program>> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        engine.create_program(config_path, options, host, previous)
    }))
    .unwrap_or_else(|payload| Err(KilnError::Program(panic_message(payload.as_ref()))))
}

pub fn program_options(config: &Config) -> ProgramOptions {
    ProgramOptions {
        root_dir: config.root_dir.clone(),
        src_dir: config.src_dir.clone(),
        out_dir: config.cache_dir.clone(),
    }
}

/// The configured program config, or a generated fallback covering `src`
pub fn ensure_program_config(config: &Config, fs: &InMemoryFileSystem) -> KilnResult<PathBuf> {
    if let Some(path) = &config.program_config {
        return Ok(path.clone());
    }

    let path = config.fallback_program_config_path();
    if fs.access(&path) {
        return Ok(path);
    }

    let src = relative_to(&config.src_dir, &config.root_dir)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_string());
    let content = serde_json::to_string_pretty(&json!({ "include": [format!("{}/**/*", src)] }))?;
    fs.write_file(&path, &content, WriteOptions::immediate())?;
    info!(target: "kiln::build", path = %path.display(), "wrote fallback program config");
    Ok(path)
}

pub struct WatchProgram {
    engine: Arc<dyn ProgramEngine>,
    config_path: Option<PathBuf>,
    options: ProgramOptions,
    host: Arc<InMemoryFileSystem>,
    previous: Mutex<Option<Arc<dyn Program>>>,
    after_program_create: Option<AfterProgramCreate>,
}

impl WatchProgram {
    pub fn new(
        engine: Arc<dyn ProgramEngine>,
        config_path: Option<PathBuf>,
        options: ProgramOptions,
        host: Arc<InMemoryFileSystem>,
    ) -> Self {
        Self {
            engine,
            config_path,
            options,
            host,
            previous: Mutex::new(None),
            after_program_create: None,
        }
    }

    pub fn with_after_program_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<dyn Program>) -> bool + Send + Sync + 'static,
    {
        self.after_program_create = Some(Box::new(hook));
        self
    }

    /// Re-analyze from the last accepted program, then run the hook
    ///
    /// The new program only replaces the baseline when the hook accepts it,
    /// so changes since a rejected program are reported again next time.
    pub fn update(&self) -> KilnResult<Arc<dyn Program>> {
        let baseline = self.previous.lock().clone();
        let program = create_program(
            self.engine.as_ref(),
            self.config_path.as_deref(),
            &self.options,
            self.host.as_ref(),
            baseline.as_ref(),
        )?;
        debug!(
            target: "kiln::build",
            engine = self.engine.name(),
            files = program.root_files().len(),
            "program updated"
        );

        let accepted = match &self.after_program_create {
            Some(hook) => hook(&program),
            None => true,
        };
        if accepted {
            *self.previous.lock() = Some(program.clone());
        } else {
            debug!(target: "kiln::build", "program not accepted, baseline kept");
        }
        Ok(program)
    }

    /// The current baseline
    pub fn current(&self) -> Option<Arc<dyn Program>> {
        self.previous.lock().clone()
    }

    /// Forget the previous program; the next update starts from scratch
    pub fn close(&self) {
        self.previous.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::validate_config;
    use crate::domain::ports::CompilerSystem;
    use crate::infrastructure::sys::MemorySystem;
    use crate::infrastructure::ScriptEngine;

    fn setup(files: &[(&str, &str)]) -> (Arc<MemorySystem>, Arc<InMemoryFileSystem>, Config) {
        let sys = Arc::new(MemorySystem::new().with_files(files.iter().map(|(p, c)| (*p, *c))));
        let fs = Arc::new(InMemoryFileSystem::new(sys.clone()));
        let (config, _) = validate_config(Config::for_root("/app"), Path::new("/"));
        (sys, fs, config)
    }

    #[test]
    fn test_fallback_config_is_written_immediately() {
        let (sys, fs, config) = setup(&[]);

        let path = ensure_program_config(&config, &fs).unwrap();

        assert_eq!(path, PathBuf::from("/app/program.fallback.json"));
        let text = sys.read_file(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["include"][0], "src/**/*");
        assert!(fs.pending_writes().is_empty());
    }

    #[test]
    fn test_configured_program_config_wins() {
        let (sys, fs, config) = setup(&[("/app/program.json", "{}")]);
        let config = Config {
            program_config: Some(PathBuf::from("/app/program.json")),
            ..config
        };

        let path = ensure_program_config(&config, &fs).unwrap();

        assert_eq!(path, PathBuf::from("/app/program.json"));
        assert!(!sys.access(&config.fallback_program_config_path()));
    }

    #[test]
    fn test_update_is_incremental_and_runs_hook() {
        let (_sys, fs, config) = setup(&[("/app/src/a.ts", "export const a = 1;\n")]);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let watch = WatchProgram::new(
            Arc::new(ScriptEngine::new()),
            None,
            program_options(&config),
            fs.clone(),
        )
        .with_after_program_create(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        });

        let first = watch.update().unwrap();
        assert_eq!(first.changes().files_added, vec![PathBuf::from("/app/src/a.ts")]);

        let second = watch.update().unwrap();
        assert!(second.changes().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        watch.close();
        assert!(watch.current().is_none());
    }

    #[test]
    fn test_rejected_program_keeps_the_baseline() {
        let (sys, fs, config) = setup(&[("/app/src/a.ts", "export const a = 1;\n")]);
        let accept = Arc::new(AtomicUsize::new(1));
        let gate = accept.clone();
        let watch = WatchProgram::new(
            Arc::new(ScriptEngine::new()),
            None,
            program_options(&config),
            fs.clone(),
        )
        .with_after_program_create(move |_| gate.load(Ordering::SeqCst) == 1);

        let first = watch.update().unwrap();

        accept.store(0, Ordering::SeqCst);
        sys.write_file(Path::new("/app/src/a.ts"), "export const a = 2;\n").unwrap();
        fs.clear_file_cache(Path::new("/app/src/a.ts"));
        let rejected = watch.update().unwrap();
        assert_eq!(rejected.changes().files_updated, vec![PathBuf::from("/app/src/a.ts")]);
        assert!(Arc::ptr_eq(&watch.current().unwrap(), &first));

        accept.store(1, Ordering::SeqCst);
        let retried = watch.update().unwrap();
        assert_eq!(retried.changes().files_updated, vec![PathBuf::from("/app/src/a.ts")]);
        assert!(Arc::ptr_eq(&watch.current().unwrap(), &retried));
    }

    struct PanickingEngine;

    impl ProgramEngine for PanickingEngine {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn create_program(
            &self,
            _: Option<&Path>,
            _: &ProgramOptions,
            _: &dyn ProgramHost,
            _: Option<&Arc<dyn Program>>,
        ) -> KilnResult<Arc<dyn Program>> {
            panic!("engine blew up")
        }
    }

    #[test]
    fn test_engine_panic_becomes_program_error() {
        let (_sys, fs, config) = setup(&[]);
        let watch = WatchProgram::new(Arc::new(PanickingEngine), None, program_options(&config), fs);

        match watch.update() {
            Err(KilnError::Program(message)) => assert!(message.contains("engine blew up")),
            other => panic!("expected a program error, got {:?}", other.map(|_| ())),
        }
        assert!(watch.current().is_none());
    }
}
