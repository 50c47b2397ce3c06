//! Scenario: Incremental Rebuilds
//!
//! Journey: A developer keeps calling `Compiler::build` while editing.
//!
//! Steps:
//! 1. First build is a full build
//! 2. Editing a component rebuilds only what changed
//! 3. Deleting a component drops it from the module map and the types
//! 4. Building again with nothing changed is a no-change build
//!
//! Success Criteria:
//! - Change sets in the results match what happened on disk
//! - Unchanged builds write nothing

use std::path::Path;

use kiln::{CompilerEventName, OutputTargetKind};

use crate::common::*;

/// SCENARIO: Edit, delete, rebuild
#[test]
fn scenario_edit_then_delete_component() {
    let project = MemoryProject::builder()
        .with_file("src/my-button.tsx", MY_BUTTON)
        .with_file("src/my-card.tsx", MY_CARD)
        .with_file("src/util.ts", UTIL)
        .build();

    let first = project.compiler.build();
    assert!(!first.has_error, "{:?}", first.diagnostics);
    assert!(!first.is_rebuild);
    assert_eq!(first.components, vec!["my-button", "my-card"]);
    assert_eq!(first.component_graph["my-card"], vec!["my-button"]);

    // edit
    project.write("src/my-button.tsx", &my_button_with_size());
    let edited = project.compiler.build();
    assert!(edited.is_rebuild);
    assert!(!edited.no_change);
    assert_eq!(edited.files_updated, vec![app_path("src/my-button.tsx")]);
    assert!(edited.has_script_changes);
    assert!(project
        .read("src/components.d.ts")
        .unwrap_or_default()
        .contains("\"size\"?: any;"));

    // delete
    project.delete("src/my-card.tsx");
    let deleted = project.compiler.build();
    assert_eq!(deleted.files_deleted, vec![app_path("src/my-card.tsx")]);
    assert_eq!(deleted.components, vec!["my-button"]);
    assert!(!project
        .compiler
        .context()
        .has_module(Path::new("/app/src/my-card.tsx")));
    assert!(!project
        .read("src/components.d.ts")
        .unwrap_or_default()
        .contains("my-card"));
}

/// SCENARIO: Nothing changed, nothing written
#[test]
fn scenario_unchanged_build_is_no_change() {
    let project = MemoryProject::builder()
        .with_file("src/my-button.tsx", MY_BUTTON)
        .build();
    project.compiler.build();
    let files_before = project.sys.file_paths();

    let no_change = project.compiler.once(CompilerEventName::BuildNoChange);
    let results = project.compiler.build();

    assert!(results.no_change);
    assert!(no_change.try_recv().is_ok());
    assert_eq!(project.sys.file_paths(), files_before);
}

/// SCENARIO: A syntax error recovers on the next build
#[test]
fn scenario_broken_file_recovers() {
    let project = MemoryProject::builder()
        .with_file("src/my-button.tsx", MY_BUTTON)
        .with_file("src/util.ts", UTIL)
        .build();
    assert!(!project.compiler.build().has_error);

    project.write("src/util.ts", BROKEN);
    let broken = project.compiler.build();
    assert!(broken.has_error);
    assert!(broken.aborted);
    assert!(broken.outputs.is_empty());

    project.write("src/util.ts", UTIL);
    let fixed = project.compiler.build();
    assert!(!fixed.has_error, "{:?}", fixed.diagnostics);
    assert!(fixed.output(OutputTargetKind::Lazy).is_some());
}
