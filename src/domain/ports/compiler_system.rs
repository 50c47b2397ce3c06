//! CompilerSystem port - the one capability interface over a backing store
//!
//! Implementations:
//! - `DiskSystem` - real file system plus `notify` watches
//! - `MemorySystem` - in-memory map, used for tests and embedded builds
//!
//! The core runs on threads, so every operation is a single blocking call.
//! Lookups never fail: absence is `false`/`None`/empty, never an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for backing store mutations
pub type SysResult<T> = Result<T, SysError>;

/// Backing store errors
#[derive(Debug, Error)]
pub enum SysError {
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watch failed for {}: {message}", path.display())]
    Watch { path: PathBuf, message: String },
}

impl SysError {
    /// Attach the path an `io::Error` happened at
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => SysError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => SysError::PermissionDenied(path.to_path_buf()),
            _ => SysError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Stat result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub is_file: bool,
    pub is_directory: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// What a watch callback observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileWatchKind {
    FileAdd,
    FileUpdate,
    FileDelete,
    DirAdd,
    DirDelete,
}

pub type FileWatchCallback = Arc<dyn Fn(&Path, FileWatchKind) + Send + Sync>;

/// A live watch; closing it (or dropping it) stops callbacks
pub trait WatchHandle: Send {
    fn close(&mut self);
}

pub trait CompilerSystem: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn access(&self, path: &Path) -> bool {
        self.stat(path).is_some()
    }

    fn stat(&self, path: &Path) -> Option<FsStats>;

    fn read_file(&self, path: &Path) -> Option<String>;

    /// Write a file, creating missing parent directories
    fn write_file(&self, path: &Path, content: &str) -> SysResult<()>;

    fn mkdir(&self, path: &Path, recursive: bool) -> SysResult<()>;

    /// Remove a directory and everything below it
    fn rmdir(&self, path: &Path) -> SysResult<()>;

    fn unlink(&self, path: &Path) -> SysResult<()>;

    /// Direct children of `path` as full normalized paths, sorted
    fn readdir(&self, path: &Path) -> Vec<PathBuf>;

    fn realpath(&self, path: &Path) -> PathBuf;

    fn current_directory(&self) -> PathBuf;

    fn watch_directory(
        &self,
        path: &Path,
        recursive: bool,
        callback: FileWatchCallback,
    ) -> SysResult<Box<dyn WatchHandle>>;

    /// Watch a single file through a watch on its parent directory
    fn watch_file(&self, path: &Path, callback: FileWatchCallback) -> SysResult<Box<dyn WatchHandle>> {
        let target = path.to_path_buf();
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("/"));
        let filtered: FileWatchCallback = Arc::new(move |changed: &Path, kind: FileWatchKind| {
            if changed == target {
                callback(changed, kind);
            }
        });
        self.watch_directory(&parent, false, filtered)
    }

    /// Quiet period before a watch re-check fires
    fn file_watch_timeout(&self) -> Duration {
        Duration::from_millis(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sys_error_display() {
        let err = SysError::NotFound(PathBuf::from("/app/a.ts"));
        assert_eq!(err.to_string(), "no such file or directory: /app/a.ts");
    }

    #[test]
    fn sys_error_from_io_maps_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err = SysError::from_io(Path::new("/x"), io_err);
        assert!(matches!(err, SysError::NotFound(p) if p == Path::new("/x")));

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = SysError::from_io(Path::new("/y"), io_err);
        assert_eq!(err.to_string(), "I/O error at /y: boom");
    }

    #[test]
    fn watch_kind_serializes_camel_case() {
        let json = serde_json::to_string(&FileWatchKind::FileAdd).unwrap();
        assert_eq!(json, "\"fileAdd\"");
    }
}
