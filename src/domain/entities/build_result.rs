//! Change sets, per-target outputs and the immutable build summary

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::diagnostic::{Diagnostic, DiagnosticLevel};
use crate::domain::value_objects::OutputTargetKind;

/// Coalesced file-system changes for one batch or one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsWatchResults {
    pub files_added: Vec<PathBuf>,
    pub files_updated: Vec<PathBuf>,
    pub files_deleted: Vec<PathBuf>,
    pub dirs_added: Vec<PathBuf>,
    pub dirs_deleted: Vec<PathBuf>,
}

impl FsWatchResults {
    pub fn is_empty(&self) -> bool {
        self.files_added.is_empty()
            && self.files_updated.is_empty()
            && self.files_deleted.is_empty()
            && self.dirs_added.is_empty()
            && self.dirs_deleted.is_empty()
    }

    /// `filesAdded ∪ filesUpdated ∪ filesDeleted`, sorted and deduplicated
    pub fn files_changed(&self) -> Vec<PathBuf> {
        let mut all: Vec<PathBuf> = self
            .files_added
            .iter()
            .chain(&self.files_updated)
            .chain(&self.files_deleted)
            .cloned()
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

/// Files written by one configured output target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    #[serde(rename = "type")]
    pub target_type: OutputTargetKind,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Immutable summary of one finished build, handed to `buildFinish`
/// and `buildNoChange` subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResults {
    pub build_id: u64,
    pub is_rebuild: bool,
    pub no_change: bool,
    pub has_error: bool,
    /// Later phases were skipped because of error-level diagnostics
    pub aborted: bool,
    pub types_changed: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub files_added: Vec<PathBuf>,
    pub files_updated: Vec<PathBuf>,
    pub files_deleted: Vec<PathBuf>,
    pub files_changed: Vec<PathBuf>,
    pub dirs_added: Vec<PathBuf>,
    pub dirs_deleted: Vec<PathBuf>,
    pub has_script_changes: bool,
    pub has_style_changes: bool,
    pub has_html_changes: bool,
    pub components: Vec<String>,
    pub component_graph: BTreeMap<String, Vec<String>>,
    pub outputs: Vec<BuildOutput>,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BuildResults {
    pub fn output(&self, kind: OutputTargetKind) -> Option<&BuildOutput> {
        self.outputs.iter().find(|o| o.target_type == kind)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
    }
}
