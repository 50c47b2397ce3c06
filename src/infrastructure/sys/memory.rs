//! In-memory CompilerSystem
//!
//! Backs builds that never touch disk (tests, embedded compilers). Writes
//! fire watch callbacks synchronously, after the entry lock is released.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use parking_lot::{Mutex, RwLock};

use crate::domain::ports::{
    CompilerSystem, FileWatchCallback, FileWatchKind, FsStats, SysError, SysResult, WatchHandle,
};
use crate::domain::value_objects::normalize_path;

#[derive(Debug, Clone)]
enum MemEntry {
    File { content: String, modified: SystemTime },
    Dir { modified: SystemTime },
}

struct Registration {
    id: u64,
    dir: PathBuf,
    recursive: bool,
    callback: FileWatchCallback,
}

impl Registration {
    fn matches(&self, path: &Path) -> bool {
        if self.recursive {
            path != self.dir && path.starts_with(&self.dir)
        } else {
            path.parent() == Some(self.dir.as_path())
        }
    }
}

type Registry = Arc<Mutex<Vec<Registration>>>;

pub struct MemorySystem {
    entries: RwLock<BTreeMap<PathBuf, MemEntry>>,
    watchers: Registry,
    next_watch_id: AtomicU64,
    cwd: PathBuf,
    watch_timeout: Duration,
}

impl MemorySystem {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            PathBuf::from("/"),
            MemEntry::Dir {
                modified: SystemTime::now(),
            },
        );
        Self {
            entries: RwLock::new(entries),
            watchers: Arc::new(Mutex::new(Vec::new())),
            next_watch_id: AtomicU64::new(1),
            cwd: PathBuf::from("/"),
            watch_timeout: Duration::from_millis(32),
        }
    }

    /// Seed files without firing watch callbacks
    pub fn with_files<P, S>(self, files: impl IntoIterator<Item = (P, S)>) -> Self
    where
        P: AsRef<Path>,
        S: Into<String>,
    {
        {
            let mut entries = self.entries.write();
            let mut ignored = Vec::new();
            for (path, content) in files {
                let path = normalize_path(path);
                ensure_parents(&mut entries, &path, &mut ignored);
                entries.insert(
                    path,
                    MemEntry::File {
                        content: content.into(),
                        modified: SystemTime::now(),
                    },
                );
            }
        }
        self
    }

    pub fn with_cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = normalize_path(cwd);
        self
    }

    pub fn with_watch_timeout(mut self, timeout: Duration) -> Self {
        self.watch_timeout = timeout;
        self
    }

    /// Number of live watch registrations
    pub fn watch_count(&self) -> usize {
        self.watchers.lock().len()
    }

    /// Every file path currently stored, sorted
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.entries
            .read()
            .iter()
            .filter(|(_, e)| matches!(e, MemEntry::File { .. }))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn notify(&self, events: Vec<(PathBuf, FileWatchKind)>) {
        if events.is_empty() {
            return;
        }
        for (path, kind) in events {
            let callbacks: Vec<FileWatchCallback> = self
                .watchers
                .lock()
                .iter()
                .filter(|r| r.matches(&path))
                .map(|r| r.callback.clone())
                .collect();
            for callback in callbacks {
                callback(&path, kind);
            }
        }
    }
}

impl Default for MemorySystem {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_parents(
    entries: &mut BTreeMap<PathBuf, MemEntry>,
    path: &Path,
    events: &mut Vec<(PathBuf, FileWatchKind)>,
) {
    let mut missing = Vec::new();
    let mut current = path.parent();
    while let Some(dir) = current {
        if entries.contains_key(dir) {
            break;
        }
        missing.push(dir.to_path_buf());
        current = dir.parent();
    }
    for dir in missing.into_iter().rev() {
        entries.insert(
            dir.clone(),
            MemEntry::Dir {
                modified: SystemTime::now(),
            },
        );
        events.push((dir, FileWatchKind::DirAdd));
    }
}

impl CompilerSystem for MemorySystem {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn stat(&self, path: &Path) -> Option<FsStats> {
        let path = normalize_path(path);
        let entries = self.entries.read();
        entries.get(&path).map(|entry| match entry {
            MemEntry::File { content, modified } => FsStats {
                is_file: true,
                is_directory: false,
                size: content.len() as u64,
                modified: Some(*modified),
            },
            MemEntry::Dir { modified } => FsStats {
                is_file: false,
                is_directory: true,
                size: 0,
                modified: Some(*modified),
            },
        })
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        let path = normalize_path(path);
        match self.entries.read().get(&path) {
            Some(MemEntry::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    fn write_file(&self, path: &Path, content: &str) -> SysResult<()> {
        let path = normalize_path(path);
        let mut events = Vec::new();
        {
            let mut entries = self.entries.write();
            let kind = match entries.get(&path) {
                Some(MemEntry::Dir { .. }) => {
                    return Err(SysError::Io {
                        path,
                        source: std::io::Error::new(std::io::ErrorKind::Other, "is a directory"),
                    })
                }
                Some(MemEntry::File { content: prior, .. }) if prior == content => None,
                Some(MemEntry::File { .. }) => Some(FileWatchKind::FileUpdate),
                None => Some(FileWatchKind::FileAdd),
            };
            ensure_parents(&mut entries, &path, &mut events);
            entries.insert(
                path.clone(),
                MemEntry::File {
                    content: content.to_string(),
                    modified: SystemTime::now(),
                },
            );
            if let Some(kind) = kind {
                events.push((path, kind));
            }
        }
        self.notify(events);
        Ok(())
    }

    fn mkdir(&self, path: &Path, recursive: bool) -> SysResult<()> {
        let path = normalize_path(path);
        let mut events = Vec::new();
        {
            let mut entries = self.entries.write();
            match entries.get(&path) {
                Some(MemEntry::Dir { .. }) => return Ok(()),
                Some(MemEntry::File { .. }) => return Err(SysError::NotADirectory(path)),
                None => {}
            }
            if let Some(parent) = path.parent() {
                if !recursive && !entries.contains_key(parent) {
                    return Err(SysError::NotFound(parent.to_path_buf()));
                }
            }
            ensure_parents(&mut entries, &path, &mut events);
            entries.insert(
                path.clone(),
                MemEntry::Dir {
                    modified: SystemTime::now(),
                },
            );
            events.push((path, FileWatchKind::DirAdd));
        }
        self.notify(events);
        Ok(())
    }

    fn rmdir(&self, path: &Path) -> SysResult<()> {
        let path = normalize_path(path);
        let mut events = Vec::new();
        {
            let mut entries = self.entries.write();
            match entries.get(&path) {
                Some(MemEntry::Dir { .. }) => {}
                Some(MemEntry::File { .. }) => return Err(SysError::NotADirectory(path)),
                None => return Err(SysError::NotFound(path)),
            }
            let doomed: Vec<PathBuf> = entries
                .keys()
                .filter(|p| p.starts_with(&path))
                .cloned()
                .collect();
            // deepest first so children are reported before their parents
            for p in doomed.into_iter().rev() {
                if let Some(entry) = entries.remove(&p) {
                    let kind = match entry {
                        MemEntry::File { .. } => FileWatchKind::FileDelete,
                        MemEntry::Dir { .. } => FileWatchKind::DirDelete,
                    };
                    events.push((p, kind));
                }
            }
        }
        self.notify(events);
        Ok(())
    }

    fn unlink(&self, path: &Path) -> SysResult<()> {
        let path = normalize_path(path);
        {
            let mut entries = self.entries.write();
            match entries.get(&path) {
                Some(MemEntry::File { .. }) => {
                    entries.remove(&path);
                }
                Some(MemEntry::Dir { .. }) => return Err(SysError::NotFound(path)),
                None => return Err(SysError::NotFound(path)),
            }
        }
        self.notify(vec![(path, FileWatchKind::FileDelete)]);
        Ok(())
    }

    fn readdir(&self, path: &Path) -> Vec<PathBuf> {
        let path = normalize_path(path);
        self.entries
            .read()
            .keys()
            .filter(|p| p.parent() == Some(path.as_path()))
            .cloned()
            .collect()
    }

    fn realpath(&self, path: &Path) -> PathBuf {
        crate::domain::value_objects::resolve_path(&self.cwd, path)
    }

    fn current_directory(&self) -> PathBuf {
        self.cwd.clone()
    }

    fn watch_directory(
        &self,
        path: &Path,
        recursive: bool,
        callback: FileWatchCallback,
    ) -> SysResult<Box<dyn WatchHandle>> {
        let id = self.next_watch_id.fetch_add(1, Ordering::SeqCst);
        self.watchers.lock().push(Registration {
            id,
            dir: normalize_path(path),
            recursive,
            callback,
        });
        Ok(Box::new(MemoryWatchHandle {
            id,
            registry: Arc::downgrade(&self.watchers),
        }))
    }

    fn file_watch_timeout(&self) -> Duration {
        self.watch_timeout
    }
}

struct MemoryWatchHandle {
    id: u64,
    registry: Weak<Mutex<Vec<Registration>>>,
}

impl WatchHandle for MemoryWatchHandle {
    fn close(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().retain(|r| r.id != self.id);
        }
    }
}

impl Drop for MemoryWatchHandle {
    fn drop(&mut self) {
        self.close();
    }
}
