//! Disk-backed CompilerSystem
//!
//! Plain `std::fs` with atomic writes, plus `notify` watches translated
//! into `FileWatchKind` callbacks.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::domain::ports::{
    CompilerSystem, FileWatchCallback, FileWatchKind, FsStats, SysError, SysResult, WatchHandle,
};
use crate::domain::value_objects::{normalize_path, resolve_path};

/// Local file system implementation
#[derive(Debug, Clone)]
pub struct DiskSystem {
    watch_timeout: Duration,
}

impl DiskSystem {
    pub fn new() -> Self {
        Self {
            watch_timeout: Duration::from_millis(80),
        }
    }

    pub fn with_watch_timeout(mut self, timeout: Duration) -> Self {
        self.watch_timeout = timeout;
        self
    }
}

impl Default for DiskSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerSystem for DiskSystem {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn stat(&self, path: &Path) -> Option<FsStats> {
        let meta = std::fs::metadata(path).ok()?;
        Some(FsStats {
            is_file: meta.is_file(),
            is_directory: meta.is_dir(),
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    fn write_file(&self, path: &Path, content: &str) -> SysResult<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| SysError::from_io(parent, e))?;

        // Write to a sibling temp file, then rename into place
        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| SysError::from_io(path, e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| SysError::from_io(path, e))?;
        tmp.persist(path)
            .map_err(|e| SysError::from_io(path, e.error))?;
        Ok(())
    }

    fn mkdir(&self, path: &Path, recursive: bool) -> SysResult<()> {
        if path.is_dir() {
            return Ok(());
        }
        let result = if recursive {
            std::fs::create_dir_all(path)
        } else {
            std::fs::create_dir(path)
        };
        result.map_err(|e| SysError::from_io(path, e))
    }

    fn rmdir(&self, path: &Path) -> SysResult<()> {
        std::fs::remove_dir_all(path).map_err(|e| SysError::from_io(path, e))
    }

    fn unlink(&self, path: &Path) -> SysResult<()> {
        std::fs::remove_file(path).map_err(|e| SysError::from_io(path, e))
    }

    fn readdir(&self, path: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(path) else {
            return Vec::new();
        };
        let mut children: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| normalize_path(entry.path()))
            .collect();
        children.sort();
        children
    }

    fn realpath(&self, path: &Path) -> PathBuf {
        std::fs::canonicalize(path)
            .map(normalize_path)
            .unwrap_or_else(|_| resolve_path(self.current_directory(), path))
    }

    fn current_directory(&self) -> PathBuf {
        std::env::current_dir()
            .map(normalize_path)
            .unwrap_or_else(|_| PathBuf::from("/"))
    }

    fn watch_directory(
        &self,
        path: &Path,
        recursive: bool,
        callback: FileWatchCallback,
    ) -> SysResult<Box<dyn WatchHandle>> {
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for (changed, kind) in map_notify_event(&event) {
                        callback(&changed, kind);
                    }
                }
                Err(err) => warn!(target: "kiln::watch", "watch error: {}", err),
            },
            Config::default(),
        )
        .map_err(|e| SysError::Watch {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(path, mode).map_err(|e| SysError::Watch {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(target: "kiln::watch", "watching {} (recursive: {})", path.display(), recursive);

        Ok(Box::new(DiskWatchHandle {
            watcher: Some(watcher),
        }))
    }

    fn file_watch_timeout(&self) -> Duration {
        self.watch_timeout
    }
}

struct DiskWatchHandle {
    watcher: Option<RecommendedWatcher>,
}

impl WatchHandle for DiskWatchHandle {
    fn close(&mut self) {
        self.watcher.take();
    }
}

/// Translate one `notify` event into watch callbacks
pub fn map_notify_event(event: &Event) -> Vec<(PathBuf, FileWatchKind)> {
    let existing_kind = |p: &Path| {
        if p.is_dir() {
            FileWatchKind::DirAdd
        } else {
            FileWatchKind::FileAdd
        }
    };

    let mut mapped = Vec::new();
    match event.kind {
        EventKind::Create(CreateKind::Folder) => {
            mapped.extend(event.paths.iter().map(|p| (p.clone(), FileWatchKind::DirAdd)));
        }
        EventKind::Create(_) => {
            mapped.extend(event.paths.iter().map(|p| (p.clone(), existing_kind(p))));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            mapped.extend(event.paths.iter().map(|p| (p.clone(), FileWatchKind::FileDelete)));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            mapped.extend(event.paths.iter().map(|p| (p.clone(), existing_kind(p))));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if let [from, to] = event.paths.as_slice() {
                mapped.push((from.clone(), FileWatchKind::FileDelete));
                mapped.push((to.clone(), existing_kind(to)));
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            for p in &event.paths {
                let kind = if p.exists() {
                    existing_kind(p)
                } else {
                    FileWatchKind::FileDelete
                };
                mapped.push((p.clone(), kind));
            }
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => {}
        EventKind::Modify(_) => {
            mapped.extend(
                event
                    .paths
                    .iter()
                    .filter(|p| !p.is_dir())
                    .map(|p| (p.clone(), FileWatchKind::FileUpdate)),
            );
        }
        EventKind::Remove(RemoveKind::Folder) => {
            mapped.extend(event.paths.iter().map(|p| (p.clone(), FileWatchKind::DirDelete)));
        }
        EventKind::Remove(_) => {
            mapped.extend(event.paths.iter().map(|p| (p.clone(), FileWatchKind::FileDelete)));
        }
        _ => {}
    }
    mapped
        .into_iter()
        .map(|(p, kind)| (normalize_path(p), kind))
        .collect()
}
