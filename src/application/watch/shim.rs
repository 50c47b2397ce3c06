//! File-watch shim between the compiler system and the scheduler
//!
//! Every watch callback lands here. Paths the build does not read are
//! dropped, the VFS cache for the path is invalidated, the change is folded
//! into the pending window, and the scheduler loop is woken up. The bus sees
//! `fsChange` and then the granular event, once per coalesced change.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::application::events::{BuildEvents, CompilerEvent};
use crate::application::fs::InMemoryFileSystem;
use crate::config::Config;
use crate::domain::ports::{FileWatchCallback, FileWatchKind};
use crate::domain::value_objects::normalize_path;
use crate::domain::value_objects::path::is_within;

use super::state::PendingChanges;

/// Wake-ups for the scheduler loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchSignal {
    Changed,
    Close(i32),
}

/// Which paths a watcher reacts to
#[derive(Debug, Clone)]
pub struct WatchFilter {
    src_dir: PathBuf,
    extra_files: Vec<PathBuf>,
    ignored_dirs: Vec<PathBuf>,
    app_types: PathBuf,
}

impl WatchFilter {
    pub fn from_config(config: &Config) -> Self {
        let mut extra_files = vec![config.index_html_path(), config.fallback_program_config_path()];
        extra_files.extend(config.program_config.iter().cloned());

        let mut ignored_dirs = vec![config.cache_dir.clone()];
        ignored_dirs.extend(config.output_targets.iter().map(|t| t.dir().to_path_buf()));

        Self {
            src_dir: config.src_dir.clone(),
            extra_files,
            ignored_dirs,
            app_types: config.app_types_path(),
        }
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        if self.extra_files.iter().any(|f| f == path) {
            return true;
        }
        is_within(path, &self.src_dir)
            && path != self.app_types
            && !self.ignored_dirs.iter().any(|dir| is_within(path, dir))
            && !path.components().any(|c| c.as_os_str() == "node_modules")
    }
}

pub struct FileWatchShim {
    filter: WatchFilter,
    fs: Arc<InMemoryFileSystem>,
    events: BuildEvents,
    pending: Arc<Mutex<PendingChanges>>,
    wake: Mutex<Sender<WatchSignal>>,
}

impl FileWatchShim {
    pub fn new(
        filter: WatchFilter,
        fs: Arc<InMemoryFileSystem>,
        events: BuildEvents,
        pending: Arc<Mutex<PendingChanges>>,
        wake: Sender<WatchSignal>,
    ) -> Self {
        Self {
            filter,
            fs,
            events,
            pending,
            wake: Mutex::new(wake),
        }
    }

    /// Callback to hand to `CompilerSystem::watch_directory`
    pub fn callback(self: &Arc<Self>) -> FileWatchCallback {
        let shim = Arc::clone(self);
        Arc::new(move |path: &Path, kind: FileWatchKind| shim.on_watch(path, kind))
    }

    /// A change reported by the compiler system
    pub fn on_watch(&self, path: &Path, kind: FileWatchKind) {
        let path = normalize_path(path);
        if !self.filter.is_watched(&path) {
            trace!(target: "kiln::watch", path = %path.display(), "ignored change");
            return;
        }
        self.push(&path, kind);
    }

    /// Record a change without filtering
    pub fn push(&self, path: &Path, kind: FileWatchKind) {
        self.fs.clear_file_cache(path);
        let recorded = self.pending.lock().record(kind, path);
        if recorded {
            trace!(target: "kiln::watch", path = %path.display(), ?kind, "change recorded");
            self.events.emit(&CompilerEvent::fs_change(kind, path));
            self.events.emit(&CompilerEvent::file_event(kind, path));
        }
        // a closed scheduler no longer listens
        let _ = self.wake.lock().send(WatchSignal::Changed);
    }
}
