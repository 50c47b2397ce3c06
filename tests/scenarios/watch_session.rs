//! Scenario: Watch Session
//!
//! Journey: A developer starts `kiln watch`, edits files, then stops it.
//!
//! Steps:
//! 1. Watcher starts and runs a full build
//! 2. Adding a component triggers one rebuild
//! 3. A manual trigger joins the pending window
//! 4. Closing returns the requested exit code
//!
//! Success Criteria:
//! - Every rebuild reports exactly the files that changed
//! - The watcher ends in the closed phase

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use kiln::{BuildResults, CompilerEventName, FileWatchKind, WatchPhase};

use crate::common::*;

fn collect_builds(project: &MemoryProject) -> Arc<Mutex<Vec<Arc<BuildResults>>>> {
    let builds = Arc::new(Mutex::new(Vec::new()));
    let sink = builds.clone();
    project.compiler.on(CompilerEventName::BuildFinish, move |event| {
        if let Some(results) = event.results() {
            sink.lock().push(results.clone());
        }
    });
    builds
}

fn wait_for(builds: &Mutex<Vec<Arc<BuildResults>>>, count: usize) -> Vec<Arc<BuildResults>> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline && builds.lock().len() < count {
        thread::sleep(Duration::from_millis(5));
    }
    builds.lock().clone()
}

/// SCENARIO: Start, add a component, stop
#[test]
fn scenario_watch_add_component_then_stop() {
    let project = MemoryProject::builder()
        .with_file("src/my-button.tsx", MY_BUTTON)
        .build();
    let builds = collect_builds(&project);
    let watcher = Arc::new(project.compiler.create_watcher());
    let handle = watcher.handle();
    let runner = watcher.clone();
    let join = thread::spawn(move || runner.start().map(|r| r.exit_code));

    let first = wait_for(&builds, 1);
    assert_eq!(first.len(), 1);
    assert!(!first[0].is_rebuild);
    assert_eq!(first[0].components, vec!["my-button"]);

    project.write("src/my-card.tsx", MY_CARD);
    let rebuilt = wait_for(&builds, 2);
    assert_eq!(rebuilt.len(), 2);
    assert_eq!(rebuilt[1].files_added, vec![app_path("src/my-card.tsx")]);
    assert_eq!(rebuilt[1].components, vec!["my-button", "my-card"]);
    assert!(project.exists("www/build/my-card.entry.js"));

    handle.close(2);
    assert_eq!(join.join().unwrap().unwrap(), 2);
    assert_eq!(handle.phase(), WatchPhase::Closed);
}

/// SCENARIO: A manual trigger is folded into the watcher's window
#[test]
fn scenario_trigger_while_watching() {
    let project = MemoryProject::builder()
        .with_file("src/my-button.tsx", MY_BUTTON)
        .build();
    let builds = collect_builds(&project);
    let watcher = Arc::new(project.compiler.create_watcher());
    let handle = watcher.handle();
    let runner = watcher.clone();
    let join = thread::spawn(move || runner.start().map(|r| r.exit_code));
    wait_for(&builds, 1);

    project.write("src/my-button.tsx", &my_button_with_size());
    project
        .compiler
        .trigger(FileWatchKind::FileUpdate, std::path::Path::new("src/my-button.tsx"));
    let rebuilt = wait_for(&builds, 2);

    assert_eq!(rebuilt.len(), 2);
    assert_eq!(rebuilt[1].files_updated, vec![app_path("src/my-button.tsx")]);

    handle.close(0);
    assert_eq!(join.join().unwrap().unwrap(), 0);
}
