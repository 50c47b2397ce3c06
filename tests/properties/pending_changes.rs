//! Property tests for coalescing watch callbacks.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use proptest::prelude::*;

use kiln::application::watch::PendingChanges;
use kiln::FileWatchKind;

const FILES: [&str; 3] = ["/app/src/a.tsx", "/app/src/b.ts", "/app/src/c.css"];

fn file_op() -> impl Strategy<Value = (FileWatchKind, usize)> {
    (
        prop_oneof![
            Just(FileWatchKind::FileAdd),
            Just(FileWatchKind::FileUpdate),
            Just(FileWatchKind::FileDelete),
        ],
        0..FILES.len(),
    )
}

fn set(paths: &[PathBuf]) -> BTreeSet<PathBuf> {
    paths.iter().cloned().collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: A path is never reported as both added and deleted, or
    /// both added and updated, in the same window.
    #[test]
    fn property_change_sets_are_disjoint(ops in proptest::collection::vec(file_op(), 0..32)) {
        let mut pending = PendingChanges::new();
        for (kind, idx) in &ops {
            pending.record(*kind, &PathBuf::from(FILES[*idx]));
        }
        let changes = pending.take();

        let added = set(&changes.files_added);
        let updated = set(&changes.files_updated);
        let deleted = set(&changes.files_deleted);
        prop_assert!(added.is_disjoint(&deleted));
        prop_assert!(added.is_disjoint(&updated));
        prop_assert!(updated.is_disjoint(&deleted));
    }

    /// PROPERTY: The last callback for a path decides how it is reported.
    #[test]
    fn property_last_change_wins(ops in proptest::collection::vec(file_op(), 1..32)) {
        let mut pending = PendingChanges::new();
        let mut last: BTreeMap<usize, FileWatchKind> = BTreeMap::new();
        for (kind, idx) in &ops {
            pending.record(*kind, &PathBuf::from(FILES[*idx]));
            last.insert(*idx, *kind);
        }
        prop_assert!(pending.has_pending());
        let changes = pending.take();

        for (idx, kind) in last {
            let path = PathBuf::from(FILES[idx]);
            match kind {
                FileWatchKind::FileAdd => prop_assert!(changes.files_added.contains(&path)),
                FileWatchKind::FileDelete => prop_assert!(changes.files_deleted.contains(&path)),
                _ => prop_assert!(
                    changes.files_updated.contains(&path) || changes.files_added.contains(&path)
                ),
            }
        }
        prop_assert!(!pending.has_pending());
    }
}
