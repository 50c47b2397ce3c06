//! Per-build state
//!
//! A `BuildContext` is created when a build starts and consumed by
//! `finish`, which freezes it into the `BuildResults` handed to subscribers.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::application::events::{BuildEvents, CompilerEvent};
use crate::config::Config;
use crate::domain::entities::{
    has_error, BuildOutput, BuildResults, ComponentMeta, Diagnostic, FsWatchResults,
};

use super::changes::ChangeSummary;

/// What the caller wants built
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Changes collected by the watcher since the last build
    pub changes: FsWatchResults,
    pub is_rebuild: bool,
    pub requires_full_build: bool,
}

impl BuildRequest {
    /// The first build of a compiler or watcher
    pub fn full() -> Self {
        Self {
            changes: FsWatchResults::default(),
            is_rebuild: false,
            requires_full_build: true,
        }
    }

    pub fn rebuild(changes: FsWatchResults) -> Self {
        Self {
            changes,
            is_rebuild: true,
            requires_full_build: false,
        }
    }
}

pub struct BuildContext {
    pub build_id: u64,
    pub is_rebuild: bool,
    pub requires_full_build: bool,
    pub changes: FsWatchResults,
    pub summary: ChangeSummary,
    pub diagnostics: Vec<Diagnostic>,
    /// Source files whose JS was emitted this build
    pub transpiled: Vec<PathBuf>,
    pub components: Vec<ComponentMeta>,
    pub component_graph: BTreeMap<String, Vec<String>>,
    pub outputs: Vec<BuildOutput>,
    pub types_changed: bool,
    pub aborted: bool,
    events: BuildEvents,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl BuildContext {
    pub fn new(
        build_id: u64,
        request: &BuildRequest,
        changes: FsWatchResults,
        config: &Config,
        events: BuildEvents,
    ) -> Self {
        let summary = ChangeSummary::classify(&changes, &config.index_html_path());
        Self {
            build_id,
            is_rebuild: request.is_rebuild,
            requires_full_build: request.requires_full_build,
            changes,
            summary,
            diagnostics: Vec::new(),
            transpiled: Vec::new(),
            components: Vec::new(),
            component_graph: BTreeMap::new(),
            outputs: Vec::new(),
            types_changed: false,
            aborted: false,
            events,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn has_error(&self) -> bool {
        has_error(&self.diagnostics)
    }

    /// Nothing the build cares about changed since the last one
    pub fn is_no_change(&self) -> bool {
        self.is_rebuild && !self.requires_full_build && self.changes.is_empty()
    }

    pub fn abort(&mut self, phase: &str) {
        info!(target: "kiln::build", build_id = self.build_id, phase, "build aborted");
        self.aborted = true;
    }

    pub fn time_span(&self, message: impl Into<String>) -> TimeSpan {
        let message = message.into();
        debug!(target: "kiln::build", build_id = self.build_id, "{}", message);
        TimeSpan {
            build_id: self.build_id,
            events: self.events.clone(),
            start: Instant::now(),
        }
    }

    /// Freeze into the immutable summary
    pub fn finish(self, no_change: bool) -> BuildResults {
        let has_error = self.has_error();
        BuildResults {
            build_id: self.build_id,
            is_rebuild: self.is_rebuild,
            no_change,
            has_error,
            aborted: self.aborted,
            types_changed: self.types_changed,
            diagnostics: self.diagnostics,
            files_changed: self.changes.files_changed(),
            files_added: self.changes.files_added,
            files_updated: self.changes.files_updated,
            files_deleted: self.changes.files_deleted,
            dirs_added: self.changes.dirs_added,
            dirs_deleted: self.changes.dirs_deleted,
            has_script_changes: self.summary.has_script_changes,
            has_style_changes: self.summary.has_style_changes,
            has_html_changes: self.summary.has_html_changes,
            components: self.components.into_iter().map(|c| c.tag_name).collect(),
            component_graph: self.component_graph,
            outputs: self.outputs,
            duration_ms: self.started.elapsed().as_millis() as u64,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Started by `BuildContext::time_span`
#[must_use]
pub struct TimeSpan {
    build_id: u64,
    events: BuildEvents,
    start: Instant,
}

impl TimeSpan {
    /// Log `<message> in N ms` and publish it as a `buildLog` event
    pub fn finish(self, message: impl AsRef<str>) -> u64 {
        let ms = self.start.elapsed().as_millis() as u64;
        let message = format!("{} in {} ms", message.as_ref(), ms);
        debug!(target: "kiln::build", build_id = self.build_id, "{}", message);
        self.events.emit(&CompilerEvent::BuildLog {
            build_id: self.build_id,
            message,
        });
        ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::CompilerEventName;
    use crate::domain::entities::DiagnosticCategory;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn build(request: &BuildRequest, changes: FsWatchResults) -> BuildContext {
        BuildContext::new(7, request, changes, &Config::for_root("/app"), BuildEvents::new())
    }

    #[test]
    fn test_no_change_only_for_empty_rebuilds() {
        assert!(build(&BuildRequest::rebuild(Default::default()), Default::default()).is_no_change());
        assert!(!build(&BuildRequest::full(), Default::default()).is_no_change());

        let changes = FsWatchResults {
            dirs_added: vec![PathBuf::from("/app/src/cmp")],
            ..Default::default()
        };
        assert!(!build(&BuildRequest::rebuild(changes.clone()), changes).is_no_change());
    }

    #[test]
    fn test_finish_carries_changes_and_errors() {
        let changes = FsWatchResults {
            files_updated: vec![PathBuf::from("/app/src/a.tsx")],
            files_added: vec![PathBuf::from("/app/src/b.css")],
            ..Default::default()
        };
        let mut ctx = build(&BuildRequest::rebuild(changes.clone()), changes);
        ctx.diagnostics
            .push(Diagnostic::error(DiagnosticCategory::Syntax, "'}' expected"));
        ctx.abort("transpile");

        let results = ctx.finish(false);
        assert_eq!(results.build_id, 7);
        assert!(results.has_error);
        assert!(results.aborted);
        assert!(results.has_script_changes);
        assert!(results.has_style_changes);
        assert_eq!(results.files_changed.len(), 2);
        assert!(results.finished_at >= results.started_at);
    }

    #[test]
    fn test_time_span_emits_build_log() {
        let events = BuildEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        events.subscribe(CompilerEventName::BuildLog, move |e| {
            if let CompilerEvent::BuildLog { build_id, message } = e {
                sink.lock().push((*build_id, message.clone()));
            }
        });

        let ctx = BuildContext::new(
            3,
            &BuildRequest::full(),
            FsWatchResults::default(),
            &Config::for_root("/app"),
            events,
        );
        ctx.time_span("transpile started").finish("transpile finished");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 3);
        assert!(seen[0].1.starts_with("transpile finished in "));
        assert!(seen[0].1.ends_with(" ms"));
    }
}
