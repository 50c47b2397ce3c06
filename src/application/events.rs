//! Compiler event bus
//!
//! Delivery is synchronous and in subscription order: `emit` returns only
//! after every matching handler ran. The registry lock is released before
//! handlers are called, so a handler may subscribe, unsubscribe or emit.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::entities::{BuildResults, FsWatchResults};
use crate::domain::ports::FileWatchKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompilerEventName {
    FileAdd,
    FileUpdate,
    FileDelete,
    DirAdd,
    DirDelete,
    FsChange,
    BuildStart,
    BuildFinish,
    BuildNoChange,
    BuildLog,
}

impl CompilerEventName {
    pub const ALL: [CompilerEventName; 10] = [
        CompilerEventName::FileAdd,
        CompilerEventName::FileUpdate,
        CompilerEventName::FileDelete,
        CompilerEventName::DirAdd,
        CompilerEventName::DirDelete,
        CompilerEventName::FsChange,
        CompilerEventName::BuildStart,
        CompilerEventName::BuildFinish,
        CompilerEventName::BuildNoChange,
        CompilerEventName::BuildLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerEventName::FileAdd => "fileAdd",
            CompilerEventName::FileUpdate => "fileUpdate",
            CompilerEventName::FileDelete => "fileDelete",
            CompilerEventName::DirAdd => "dirAdd",
            CompilerEventName::DirDelete => "dirDelete",
            CompilerEventName::FsChange => "fsChange",
            CompilerEventName::BuildStart => "buildStart",
            CompilerEventName::BuildFinish => "buildFinish",
            CompilerEventName::BuildNoChange => "buildNoChange",
            CompilerEventName::BuildLog => "buildLog",
        }
    }
}

impl fmt::Display for CompilerEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilerEventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown compiler event '{}'", s))
    }
}

impl From<FileWatchKind> for CompilerEventName {
    fn from(kind: FileWatchKind) -> Self {
        match kind {
            FileWatchKind::FileAdd => CompilerEventName::FileAdd,
            FileWatchKind::FileUpdate => CompilerEventName::FileUpdate,
            FileWatchKind::FileDelete => CompilerEventName::FileDelete,
            FileWatchKind::DirAdd => CompilerEventName::DirAdd,
            FileWatchKind::DirDelete => CompilerEventName::DirDelete,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CompilerEvent {
    FileAdd { path: PathBuf },
    FileUpdate { path: PathBuf },
    FileDelete { path: PathBuf },
    DirAdd { path: PathBuf },
    DirDelete { path: PathBuf },
    FsChange { results: FsWatchResults },
    BuildStart { build_id: u64, is_rebuild: bool },
    BuildFinish { results: Arc<BuildResults> },
    BuildNoChange { results: Arc<BuildResults> },
    BuildLog { build_id: u64, message: String },
}

impl CompilerEvent {
    /// The granular event for one watched change
    pub fn file_event(kind: FileWatchKind, path: &Path) -> Self {
        let path = path.to_path_buf();
        match kind {
            FileWatchKind::FileAdd => CompilerEvent::FileAdd { path },
            FileWatchKind::FileUpdate => CompilerEvent::FileUpdate { path },
            FileWatchKind::FileDelete => CompilerEvent::FileDelete { path },
            FileWatchKind::DirAdd => CompilerEvent::DirAdd { path },
            FileWatchKind::DirDelete => CompilerEvent::DirDelete { path },
        }
    }

    /// The `fsChange` aggregate for one watched change
    pub fn fs_change(kind: FileWatchKind, path: &Path) -> Self {
        let mut results = FsWatchResults::default();
        let path = path.to_path_buf();
        match kind {
            FileWatchKind::FileAdd => results.files_added.push(path),
            FileWatchKind::FileUpdate => results.files_updated.push(path),
            FileWatchKind::FileDelete => results.files_deleted.push(path),
            FileWatchKind::DirAdd => results.dirs_added.push(path),
            FileWatchKind::DirDelete => results.dirs_deleted.push(path),
        }
        CompilerEvent::FsChange { results }
    }

    pub fn name(&self) -> CompilerEventName {
        match self {
            CompilerEvent::FileAdd { .. } => CompilerEventName::FileAdd,
            CompilerEvent::FileUpdate { .. } => CompilerEventName::FileUpdate,
            CompilerEvent::FileDelete { .. } => CompilerEventName::FileDelete,
            CompilerEvent::DirAdd { .. } => CompilerEventName::DirAdd,
            CompilerEvent::DirDelete { .. } => CompilerEventName::DirDelete,
            CompilerEvent::FsChange { .. } => CompilerEventName::FsChange,
            CompilerEvent::BuildStart { .. } => CompilerEventName::BuildStart,
            CompilerEvent::BuildFinish { .. } => CompilerEventName::BuildFinish,
            CompilerEvent::BuildNoChange { .. } => CompilerEventName::BuildNoChange,
            CompilerEvent::BuildLog { .. } => CompilerEventName::BuildLog,
        }
    }

    /// Build results carried by terminal build events
    pub fn results(&self) -> Option<&Arc<BuildResults>> {
        match self {
            CompilerEvent::BuildFinish { results } | CompilerEvent::BuildNoChange { results } => {
                Some(results)
            }
            _ => None,
        }
    }

    /// Convert to JSON string with "command": "kiln" field included
    pub fn to_json(&self) -> String {
        let mut value =
            serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"event": "error"}));
        if let Some(obj) = value.as_object_mut() {
            obj.insert("command".to_string(), serde_json::json!("kiln"));
        }
        serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string())
    }
}

pub type EventHandler = Arc<dyn Fn(&CompilerEvent) + Send + Sync>;

struct Entry {
    id: u64,
    filter: Option<CompilerEventName>,
    handler: EventHandler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Publish/subscribe bus shared by everything in one compiler
#[derive(Clone, Default)]
pub struct BuildEvents {
    registry: Arc<Mutex<Registry>>,
}

/// Returned by `subscribe`; call `unsubscribe` to detach the handler
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Detach the handler; false if it was already gone
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock();
        let before = registry.entries.len();
        registry.entries.retain(|e| e.id != self.id);
        registry.entries.len() != before
    }
}

impl BuildEvents {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, filter: Option<CompilerEventName>, handler: EventHandler) -> Subscription {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push(Entry { id, filter, handler });
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn subscribe<F>(&self, name: CompilerEventName, handler: F) -> Subscription
    where
        F: Fn(&CompilerEvent) + Send + Sync + 'static,
    {
        self.add(Some(name), Arc::new(handler))
    }

    /// Receive every event
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&CompilerEvent) + Send + Sync + 'static,
    {
        self.add(None, Arc::new(handler))
    }

    /// Deliver the next `name` event on a channel, then detach
    pub fn once(&self, name: CompilerEventName) -> Receiver<CompilerEvent> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let fired = Arc::new(AtomicBool::new(false));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let handler_fired = fired.clone();
        let handler_slot = slot.clone();
        let sub = self.subscribe(name, move |event: &CompilerEvent| {
            if handler_fired.swap(true, Ordering::SeqCst) {
                return;
            }
            let _ = tx.lock().send(event.clone());
            if let Some(sub) = handler_slot.lock().take() {
                sub.unsubscribe();
            }
        });

        if fired.load(Ordering::SeqCst) {
            sub.unsubscribe();
        } else {
            *slot.lock() = Some(sub);
            // the event may have fired between the check and the store
            if fired.load(Ordering::SeqCst) {
                if let Some(sub) = slot.lock().take() {
                    sub.unsubscribe();
                }
            }
        }
        rx
    }

    pub fn emit(&self, event: &CompilerEvent) {
        let name = event.name();
        let handlers: Vec<EventHandler> = self
            .registry
            .lock()
            .entries
            .iter()
            .filter(|e| e.filter.map_or(true, |f| f == name))
            .map(|e| e.handler.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn unsubscribe_all(&self) {
        self.registry.lock().entries.clear();
    }

    pub fn handler_count(&self) -> usize {
        self.registry.lock().entries.len()
    }
}
