//! Coalescing of raw watch callbacks between two build cycles

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::domain::entities::FsWatchResults;
use crate::domain::ports::FileWatchKind;

/// Changes seen since the last cycle, deduplicated by normalized path
#[derive(Debug, Default)]
pub struct PendingChanges {
    files_added: BTreeSet<PathBuf>,
    files_updated: BTreeSet<PathBuf>,
    files_deleted: BTreeSet<PathBuf>,
    dirs_added: BTreeSet<PathBuf>,
    dirs_deleted: BTreeSet<PathBuf>,
    last_change: Option<Instant>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one change; false when it adds nothing to the current window
    pub fn record(&mut self, kind: FileWatchKind, path: &Path) -> bool {
        let path = path.to_path_buf();
        let recorded = match kind {
            FileWatchKind::FileAdd => {
                self.files_deleted.remove(&path);
                self.files_updated.remove(&path);
                self.files_added.insert(path)
            }
            FileWatchKind::FileUpdate => {
                let recreated = self.files_deleted.remove(&path);
                !self.files_added.contains(&path) && (self.files_updated.insert(path) || recreated)
            }
            FileWatchKind::FileDelete => {
                self.files_added.remove(&path);
                self.files_updated.remove(&path);
                self.files_deleted.insert(path)
            }
            FileWatchKind::DirAdd => {
                self.dirs_deleted.remove(&path);
                self.dirs_added.insert(path)
            }
            FileWatchKind::DirDelete => {
                self.dirs_added.remove(&path);
                self.dirs_deleted.insert(path)
            }
        };
        self.last_change = Some(Instant::now());
        recorded
    }

    pub fn has_pending(&self) -> bool {
        !(self.files_added.is_empty()
            && self.files_updated.is_empty()
            && self.files_deleted.is_empty()
            && self.dirs_added.is_empty()
            && self.dirs_deleted.is_empty())
    }

    /// Pending changes that have been quiet for `timeout`
    pub fn is_ready(&self, timeout: Duration) -> bool {
        match self.last_change {
            Some(last) => self.has_pending() && last.elapsed() >= timeout,
            None => false,
        }
    }

    /// Take everything, leaving an empty window
    pub fn take(&mut self) -> FsWatchResults {
        self.last_change = None;
        FsWatchResults {
            files_added: std::mem::take(&mut self.files_added).into_iter().collect(),
            files_updated: std::mem::take(&mut self.files_updated).into_iter().collect(),
            files_deleted: std::mem::take(&mut self.files_deleted).into_iter().collect(),
            dirs_added: std::mem::take(&mut self.dirs_added).into_iter().collect(),
            dirs_deleted: std::mem::take(&mut self.dirs_deleted).into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(path: &str) -> PathBuf {
        PathBuf::from(path)
    }

    #[test]
    fn test_debounce_waits_for_quiet() {
        let mut state = PendingChanges::new();
        assert!(!state.is_ready(Duration::ZERO));

        state.record(FileWatchKind::FileUpdate, &p("/app/src/a.ts"));
        assert!(!state.is_ready(Duration::from_secs(60)));
        assert!(state.is_ready(Duration::ZERO));

        let changes = state.take();
        assert_eq!(changes.files_updated, vec![p("/app/src/a.ts")]);
        assert!(!state.has_pending());
        assert!(!state.is_ready(Duration::ZERO));
    }

    #[test]
    fn test_repeated_updates_record_once() {
        let mut state = PendingChanges::new();
        assert!(state.record(FileWatchKind::FileUpdate, &p("/app/src/a.ts")));
        assert!(!state.record(FileWatchKind::FileUpdate, &p("/app/src/a.ts")));
        assert_eq!(state.take().files_updated.len(), 1);
    }

    #[test]
    fn test_update_after_add_stays_an_add() {
        let mut state = PendingChanges::new();
        assert!(state.record(FileWatchKind::FileAdd, &p("/app/src/new.ts")));
        assert!(!state.record(FileWatchKind::FileUpdate, &p("/app/src/new.ts")));

        let changes = state.take();
        assert_eq!(changes.files_added, vec![p("/app/src/new.ts")]);
        assert!(changes.files_updated.is_empty());
    }

    #[test]
    fn test_delete_cancels_add_and_update() {
        let mut state = PendingChanges::new();
        state.record(FileWatchKind::FileAdd, &p("/app/src/a.ts"));
        state.record(FileWatchKind::FileUpdate, &p("/app/src/b.ts"));
        state.record(FileWatchKind::FileDelete, &p("/app/src/a.ts"));
        state.record(FileWatchKind::FileDelete, &p("/app/src/b.ts"));

        let changes = state.take();
        assert!(changes.files_added.is_empty());
        assert!(changes.files_updated.is_empty());
        assert_eq!(changes.files_deleted, vec![p("/app/src/a.ts"), p("/app/src/b.ts")]);
    }

    #[test]
    fn test_re_add_after_delete() {
        let mut state = PendingChanges::new();
        state.record(FileWatchKind::FileDelete, &p("/app/src/a.ts"));
        state.record(FileWatchKind::FileAdd, &p("/app/src/a.ts"));

        let changes = state.take();
        assert_eq!(changes.files_added, vec![p("/app/src/a.ts")]);
        assert!(changes.files_deleted.is_empty());
    }

    #[test]
    fn test_update_after_delete_cancels_delete() {
        let mut state = PendingChanges::new();
        state.record(FileWatchKind::FileDelete, &p("/app/src/a.ts"));
        assert!(state.record(FileWatchKind::FileUpdate, &p("/app/src/a.ts")));

        let changes = state.take();
        assert!(changes.files_deleted.is_empty());
        assert_eq!(changes.files_updated, vec![p("/app/src/a.ts")]);
    }

    #[test]
    fn test_dir_changes() {
        let mut state = PendingChanges::new();
        state.record(FileWatchKind::DirAdd, &p("/app/src/cmp"));
        state.record(FileWatchKind::DirDelete, &p("/app/src/cmp"));

        let changes = state.take();
        assert!(changes.dirs_added.is_empty());
        assert_eq!(changes.dirs_deleted, vec![p("/app/src/cmp")]);
    }
}
