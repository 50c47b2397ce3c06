//! Watch scheduler
//!
//! `Watcher::start` blocks the calling thread: it runs the first (full)
//! build, then sleeps on a signal channel until the pending window is quiet
//! for the file-watch timeout, and runs one rebuild per window. Builds run on
//! the loop thread, so a window that fills up while a build is in flight
//! becomes exactly one follow-up cycle. Close requests are only looked at
//! between cycles.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::build::{BuildRequest, BuildRunner};
use crate::application::compiler_ctx::CompilerContext;
use crate::application::events::{CompilerEvent, CompilerEventName, Subscription};
use crate::application::program_host::{ensure_program_config, program_options, WatchProgram};
use crate::domain::ports::{FileWatchKind, ProgramEngine, WatchHandle};
use crate::error::{KilnError, KilnResult};

use super::shim::{FileWatchShim, WatchFilter, WatchSignal};
use super::state::PendingChanges;

/// How long the loop sleeps between checks of the pending window
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WatchPhase {
    Idle,
    Watching,
    Rebuilding,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherCloseResults {
    pub exit_code: i32,
}

struct WatchShared {
    phase: Mutex<WatchPhase>,
    running: AtomicBool,
}

impl WatchShared {
    fn set_phase(&self, phase: WatchPhase) {
        *self.phase.lock() = phase;
        debug!(target: "kiln::watch", ?phase, "watch phase");
    }
}

/// Cheap handle for closing a watcher from another thread
#[derive(Clone)]
pub struct WatcherHandle {
    shared: Arc<WatchShared>,
    signals: Sender<WatchSignal>,
    shim: Arc<FileWatchShim>,
}

impl WatcherHandle {
    /// Ask the loop to stop once the current cycle is done
    pub fn close(&self, exit_code: i32) {
        // the loop may already be gone
        let _ = self.signals.send(WatchSignal::Close(exit_code));
    }

    /// A build is in flight
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> WatchPhase {
        *self.shared.phase.lock()
    }

    /// Feed a change into the pending window as if the system had reported it
    pub fn notify(&self, kind: FileWatchKind, path: &Path) {
        self.shim.push(path, kind);
    }
}

pub struct Watcher {
    ctx: Arc<CompilerContext>,
    runner: Arc<BuildRunner>,
    engine: Arc<dyn ProgramEngine>,
    shared: Arc<WatchShared>,
    pending: Arc<Mutex<PendingChanges>>,
    shim: Arc<FileWatchShim>,
    signals: Sender<WatchSignal>,
    receiver: Mutex<Option<Receiver<WatchSignal>>>,
}

impl Watcher {
    pub fn new(ctx: Arc<CompilerContext>, runner: Arc<BuildRunner>, engine: Arc<dyn ProgramEngine>) -> Self {
        let (signals, receiver) = channel();
        let pending = Arc::new(Mutex::new(PendingChanges::new()));
        let shim = Arc::new(FileWatchShim::new(
            WatchFilter::from_config(ctx.config()),
            ctx.fs().clone(),
            ctx.events().clone(),
            pending.clone(),
            signals.clone(),
        ));
        Self {
            ctx,
            runner,
            engine,
            shared: Arc::new(WatchShared {
                phase: Mutex::new(WatchPhase::Idle),
                running: AtomicBool::new(false),
            }),
            pending,
            shim,
            signals,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    pub fn handle(&self) -> WatcherHandle {
        WatcherHandle {
            shared: self.shared.clone(),
            signals: self.signals.clone(),
            shim: self.shim.clone(),
        }
    }

    pub fn close(&self, exit_code: i32) {
        self.handle().close(exit_code);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> WatchPhase {
        *self.shared.phase.lock()
    }

    pub fn on<F>(&self, name: CompilerEventName, handler: F) -> Subscription
    where
        F: Fn(&CompilerEvent) + Send + Sync + 'static,
    {
        self.ctx.events().subscribe(name, handler)
    }

    /// Run until closed
    pub fn start(&self) -> KilnResult<WatcherCloseResults> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or_else(|| KilnError::Watch("watcher was already started".to_string()))?;

        let config = self.ctx.config().clone();
        let fs = self.ctx.fs().clone();
        let config_path = ensure_program_config(&config, &fs)?;
        let timeout = config.file_watch_timeout(fs.sys().file_watch_timeout());

        if !fs.access(&config.src_dir) {
            fs.ensure_dir(&config.src_dir)?;
        }
        let mut handles: Vec<Box<dyn WatchHandle>> = vec![
            fs.sys().watch_directory(&config.src_dir, true, self.shim.callback())?,
            fs.sys().watch_file(&config_path, self.shim.callback())?,
        ];
        info!(
            target: "kiln::watch",
            src = %config.src_dir.display(),
            timeout_ms = timeout.as_millis() as u64,
            "watching"
        );

        let request_slot: Arc<Mutex<Option<BuildRequest>>> = Arc::new(Mutex::new(None));
        let slot = request_slot.clone();
        let runner = self.runner.clone();
        let program = WatchProgram::new(
            self.engine.clone(),
            Some(config_path),
            program_options(&config),
            fs.clone(),
        )
        .with_after_program_create(move |program| {
            let request = slot.lock().take().unwrap_or_else(BuildRequest::full);
            !runner.run(program, request).aborted
        });

        self.cycle(&program, &request_slot, BuildRequest::full());

        let exit_code = loop {
            match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(WatchSignal::Close(code)) => break code,
                Ok(WatchSignal::Changed) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break 0,
            }

            let ready = self.pending.lock().is_ready(timeout);
            if ready {
                let changes = self.pending.lock().take();
                self.cycle(&program, &request_slot, BuildRequest::rebuild(changes));
            }
        };

        for handle in &mut handles {
            handle.close();
        }
        program.close();
        self.shared.set_phase(WatchPhase::Closed);
        info!(target: "kiln::watch", exit_code, "watcher closed");
        Ok(WatcherCloseResults { exit_code })
    }

    /// One program update; the build runs from the program hook
    fn cycle(&self, program: &WatchProgram, slot: &Mutex<Option<BuildRequest>>, request: BuildRequest) {
        self.shared.set_phase(WatchPhase::Rebuilding);
        self.shared.running.store(true, Ordering::SeqCst);

        *slot.lock() = Some(request.clone());
        if let Err(err) = program.update() {
            warn!(target: "kiln::watch", "program update failed: {}", err);
            let request = slot.lock().take().unwrap_or(request);
            self.runner.fail(&request, err);
        }

        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.set_phase(WatchPhase::Watching);
    }
}
