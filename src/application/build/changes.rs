//! Change classification for one build

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::domain::entities::FsWatchResults;
use crate::domain::ports::Program;
use crate::domain::value_objects::path::{is_script_file, is_style_file};

/// Flags derived from a build's change set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub has_script_changes: bool,
    pub has_style_changes: bool,
    pub has_html_changes: bool,
    pub scripts_added: Vec<PathBuf>,
    pub scripts_deleted: Vec<PathBuf>,
}

impl ChangeSummary {
    pub fn classify(changes: &FsWatchResults, index_html: &Path) -> Self {
        let changed = changes.files_changed();
        Self {
            has_script_changes: changed.iter().any(|p| is_script_file(p)),
            has_style_changes: changed.iter().any(|p| is_style_file(p)),
            has_html_changes: changed.iter().any(|p| p == index_html),
            scripts_added: changes
                .files_added
                .iter()
                .filter(|p| is_script_file(p))
                .cloned()
                .collect(),
            scripts_deleted: changes
                .files_deleted
                .iter()
                .filter(|p| is_script_file(p))
                .cloned()
                .collect(),
        }
    }

    /// The module graph changed shape, cached resolutions may be stale
    pub fn has_structure_changes(&self) -> bool {
        !self.scripts_added.is_empty() || !self.scripts_deleted.is_empty()
    }
}

/// Union of what the watcher saw and what the program reports changed
///
/// Script files the watcher reported as updated but whose content the
/// program found unchanged are dropped, so saving a file without editing it
/// ends in `buildNoChange`.
pub fn collect_changes(watched: &FsWatchResults, program: &dyn Program) -> FsWatchResults {
    let reported = program.changes();
    let reported_updates: BTreeSet<&PathBuf> = reported.files_updated.iter().collect();
    let in_program = |p: &Path| program.source_file(p).is_some();

    let spurious = |p: &PathBuf| {
        is_script_file(p) && in_program(p) && !reported_updates.contains(p)
    };

    FsWatchResults {
        files_added: union(&watched.files_added, &reported.files_added),
        files_updated: union(
            &watched
                .files_updated
                .iter()
                .filter(|p| !spurious(p))
                .cloned()
                .collect::<Vec<_>>(),
            &reported.files_updated,
        ),
        files_deleted: union(&watched.files_deleted, &reported.files_deleted),
        dirs_added: union(&watched.dirs_added, &[]),
        dirs_deleted: union(&watched.dirs_deleted, &[]),
    }
}

fn union(a: &[PathBuf], b: &[PathBuf]) -> Vec<PathBuf> {
    let set: BTreeSet<&PathBuf> = a.iter().chain(b).collect();
    set.into_iter().cloned().collect()
}
