//! Virtual file system
//!
//! `InMemoryFileSystem` sits between the build core and a `CompilerSystem`.
//! Reads are cached, writes are buffered until `commit()` unless asked to
//! go straight through, and a read always sees the latest write to the same
//! path (read-your-writes), committed or not.
//!
//! Absence is never an error: missing paths yield `None`/`false`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::ports::{CompilerSystem, FsStats, ProgramHost, SysError};
use crate::domain::value_objects::normalize_path;
use crate::error::KilnResult;

/// Where a cached file's content lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileSource {
    /// Mirrors (or will be flushed to) the backing store
    #[default]
    BackingStore,
    /// Never flushed; exists only in this cache
    MemoryOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub use_cache: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Write through to the backing store now instead of at `commit()`
    pub immediate_write: bool,
    /// Keep the content in the cache only
    pub in_memory_only: bool,
}

impl WriteOptions {
    pub fn immediate() -> Self {
        Self {
            immediate_write: true,
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            in_memory_only: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResult {
    pub changed_content: bool,
    pub queued_write: bool,
    /// Content matched what was already known, nothing was done
    pub ignored: bool,
}

/// One flushed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    pub path: PathBuf,
    /// Content differed from what the backing store held
    pub changed: bool,
}

#[derive(Debug, Clone, Default)]
struct FsItem {
    file_text: Option<String>,
    /// `None` until the backing store was consulted
    exists: Option<bool>,
    is_file: bool,
    is_directory: bool,
    size: u64,
    modified: Option<SystemTime>,
    queue_write: bool,
    source: FileSource,
}

impl FsItem {
    fn is_pinned(&self) -> bool {
        self.queue_write || self.source == FileSource::MemoryOnly
    }

    fn stats(&self) -> FsStats {
        FsStats {
            is_file: self.is_file,
            is_directory: self.is_directory,
            size: self.size,
            modified: self.modified,
        }
    }
}

pub struct InMemoryFileSystem {
    sys: Arc<dyn CompilerSystem>,
    items: RwLock<HashMap<PathBuf, FsItem>>,
}

impl InMemoryFileSystem {
    pub fn new(sys: Arc<dyn CompilerSystem>) -> Self {
        Self {
            sys,
            items: RwLock::new(HashMap::new()),
        }
    }

    /// The backing store
    pub fn sys(&self) -> &Arc<dyn CompilerSystem> {
        &self.sys
    }

    pub fn access(&self, path: &Path) -> bool {
        self.stat(path).is_some()
    }

    pub fn stat(&self, path: &Path) -> Option<FsStats> {
        let path = normalize_path(path);
        if let Some(item) = self.items.read().get(&path) {
            match item.exists {
                Some(true) if item.is_file || item.is_directory => return Some(item.stats()),
                Some(false) => return None,
                _ => {}
            }
        }

        let stats = self.sys.stat(&path);
        let mut items = self.items.write();
        let implicit_dir = stats.is_none()
            && items.iter().any(|(p, i)| i.is_pinned() && *p != path && p.starts_with(&path));
        let item = items.entry(path).or_default();
        if item.is_pinned() {
            return Some(item.stats());
        }
        if implicit_dir {
            // parent of buffered or memory-only files only
            return Some(FsStats {
                is_file: false,
                is_directory: true,
                size: 0,
                modified: None,
            });
        }
        match stats {
            Some(s) => {
                item.exists = Some(true);
                item.is_file = s.is_file;
                item.is_directory = s.is_directory;
                item.size = s.size;
                item.modified = s.modified;
            }
            None => {
                item.exists = Some(false);
                item.file_text = None;
            }
        }
        stats
    }

    pub fn read_file(&self, path: &Path) -> Option<String> {
        self.read_file_with(path, ReadOptions::default())
    }

    pub fn read_file_with(&self, path: &Path, opts: ReadOptions) -> Option<String> {
        let path = normalize_path(path);
        if let Some(item) = self.items.read().get(&path) {
            if item.is_pinned() || opts.use_cache {
                if let Some(text) = &item.file_text {
                    return Some(text.clone());
                }
                if opts.use_cache && item.exists == Some(false) {
                    return None;
                }
            }
        }

        let text = self.sys.read_file(&path);
        let mut items = self.items.write();
        let item = items.entry(path).or_default();
        if item.is_pinned() {
            // a write landed while we were reading the backing store
            return item.file_text.clone();
        }
        match &text {
            Some(content) => {
                item.exists = Some(true);
                item.is_file = true;
                item.is_directory = false;
                item.size = content.len() as u64;
                item.file_text = Some(content.clone());
            }
            None => {
                item.exists = Some(false);
                item.file_text = None;
            }
        }
        text
    }

    pub fn write_file(&self, path: &Path, content: &str, opts: WriteOptions) -> KilnResult<WriteResult> {
        let path = normalize_path(path);
        let queued_write;
        let changed_content;
        {
            let mut items = self.items.write();
            let item = items.entry(path.clone()).or_default();
            changed_content = item.file_text.as_deref() != Some(content);

            let wants_memory = opts.in_memory_only;
            let source_unchanged = (item.source == FileSource::MemoryOnly) == wants_memory;
            if !changed_content && source_unchanged && !opts.immediate_write {
                return Ok(WriteResult {
                    changed_content: false,
                    queued_write: item.queue_write,
                    ignored: true,
                });
            }

            item.file_text = Some(content.to_string());
            item.exists = Some(true);
            item.is_file = true;
            item.is_directory = false;
            item.size = content.len() as u64;
            item.modified = Some(SystemTime::now());

            if wants_memory {
                item.source = FileSource::MemoryOnly;
                item.queue_write = false;
            } else {
                item.source = FileSource::BackingStore;
                item.queue_write = !opts.immediate_write;
            }
            queued_write = item.queue_write;

            // ancestors may have been cached as missing
            let mut parent = path.parent();
            while let Some(dir) = parent {
                if items.get(dir).is_some_and(|i| i.exists == Some(false)) {
                    items.remove(dir);
                }
                parent = dir.parent();
            }
        }

        if opts.immediate_write && !opts.in_memory_only {
            self.sys.write_file(&path, content)?;
        }

        Ok(WriteResult {
            changed_content,
            queued_write,
            ignored: false,
        })
    }

    /// Flush buffered writes, reporting which ones changed the backing store
    pub fn commit(&self) -> KilnResult<Vec<CommitEntry>> {
        let mut queued: Vec<(PathBuf, String)> = {
            let mut items = self.items.write();
            items
                .iter_mut()
                .filter(|(_, item)| item.queue_write)
                .filter_map(|(path, item)| {
                    item.queue_write = false;
                    item.file_text.clone().map(|text| (path.clone(), text))
                })
                .collect()
        };
        queued.sort_by(|a, b| a.0.cmp(&b.0));

        let mut entries = Vec::with_capacity(queued.len());
        let mut first_error: Option<SysError> = None;
        for (path, text) in queued {
            let changed = self.sys.read_file(&path).as_deref() != Some(text.as_str());
            if changed {
                if let Err(err) = self.sys.write_file(&path, &text) {
                    if let Some(item) = self.items.write().get_mut(&path) {
                        item.queue_write = true;
                    }
                    first_error.get_or_insert(err);
                    continue;
                }
            }
            entries.push(CommitEntry { path, changed });
        }

        debug!(
            target: "kiln::fs",
            "commit: {} file(s), {} changed",
            entries.len(),
            entries.iter().filter(|e| e.changed).count()
        );

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(entries),
        }
    }

    /// Forget what is cached for `path`; buffered and memory-only content is kept
    pub fn clear_file_cache(&self, path: &Path) {
        let path = normalize_path(path);
        let mut items = self.items.write();
        if items.get(&path).is_some_and(|item| !item.is_pinned()) {
            items.remove(&path);
        }
    }

    pub fn clear_cache(&self) {
        self.items.write().retain(|_, item| item.is_pinned());
    }

    pub fn remove_file(&self, path: &Path) -> KilnResult<()> {
        let path = normalize_path(path);
        {
            let mut items = self.items.write();
            let item = items.entry(path.clone()).or_default();
            *item = FsItem {
                exists: Some(false),
                ..FsItem::default()
            };
        }
        match self.sys.unlink(&path) {
            Ok(()) | Err(SysError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn ensure_dir(&self, path: &Path) -> KilnResult<()> {
        let path = normalize_path(path);
        self.sys.mkdir(&path, true)?;
        self.items.write().insert(
            path,
            FsItem {
                exists: Some(true),
                is_directory: true,
                ..FsItem::default()
            },
        );
        Ok(())
    }

    /// Paths written but not yet committed, sorted
    pub fn pending_writes(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .items
            .read()
            .iter()
            .filter(|(_, item)| item.queue_write)
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Directory entries from the backing store merged with buffered content
    pub fn readdir(&self, dir: &Path, recursive: bool) -> Vec<PathBuf> {
        let dir = normalize_path(dir);
        let mut found = BTreeSet::new();

        let mut stack = vec![dir.clone()];
        while let Some(current) = stack.pop() {
            for child in self.sys.readdir(&current) {
                let is_dir = self.sys.stat(&child).is_some_and(|s| s.is_directory);
                if found.insert(child.clone()) && recursive && is_dir {
                    stack.push(child);
                }
            }
        }

        let items = self.items.read();
        for (path, item) in items.iter() {
            if !item.is_pinned() || item.exists == Some(false) {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&dir) else { continue };
            let mut current = dir.clone();
            for (depth, part) in rel.components().enumerate() {
                current.push(part);
                found.insert(current.clone());
                if !recursive && depth == 0 {
                    break;
                }
            }
        }
        found.remove(&dir);
        found.into_iter().collect()
    }

    /// Files (not directories) below `dir`
    pub fn read_dir_files(&self, dir: &Path, recursive: bool) -> Vec<PathBuf> {
        self.readdir(dir, recursive)
            .into_iter()
            .filter(|p| self.stat(p).is_some_and(|s| s.is_file))
            .collect()
    }
}

impl ProgramHost for InMemoryFileSystem {
    fn read_file(&self, path: &Path) -> Option<String> {
        // sources may change between one-shot builds without a watcher
        self.read_file_with(path, ReadOptions { use_cache: false })
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.stat(path).is_some_and(|s| s.is_file)
    }

    fn read_directory(&self, dir: &Path, recursive: bool) -> Vec<PathBuf> {
        self.read_dir_files(dir, recursive)
    }

    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()> {
        InMemoryFileSystem::write_file(self, path, content, WriteOptions::default()).map(|_| ())
    }
}
