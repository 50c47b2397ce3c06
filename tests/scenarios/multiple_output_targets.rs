//! Scenario: Several Output Targets
//!
//! Journey: A library ships lazy bundles for its docs site, standalone custom
//! elements for other apps, and a collection for other kiln projects.
//!
//! Success Criteria:
//! - Every configured target reports its own files, in config order
//! - Nothing reaches the backing store before the build commits

use std::sync::{Arc, Mutex};

use kiln::{CompilerEventName, CompilerSystem, OutputTarget, OutputTargetKind};

use crate::common::*;

fn library() -> MemoryProject {
    MemoryProject::builder()
        .with_file("src/my-button.tsx", MY_BUTTON)
        .with_file("src/my-card.tsx", MY_CARD)
        .with_targets(vec![
            OutputTarget::new(OutputTargetKind::Lazy, "www/build"),
            OutputTarget::new(OutputTargetKind::CustomElement, "dist/components"),
            OutputTarget::new(OutputTargetKind::Collection, "dist/collection"),
        ])
        .build()
}

/// SCENARIO: One build fills every target
#[test]
fn scenario_each_target_gets_outputs() {
    let project = library();

    let results = project.compiler.build();

    assert!(!results.has_error, "{:?}", results.diagnostics);
    let kinds: Vec<OutputTargetKind> = results.outputs.iter().map(|o| o.target_type).collect();
    assert_eq!(
        kinds,
        vec![
            OutputTargetKind::Lazy,
            OutputTargetKind::CustomElement,
            OutputTargetKind::Collection
        ]
    );

    let lazy = results.output(OutputTargetKind::Lazy).unwrap();
    assert!(lazy.files.contains(&app_path("www/build/my-card.entry.js")));

    let custom = results.output(OutputTargetKind::CustomElement).unwrap();
    assert!(custom.files.contains(&app_path("dist/components/my-button.js")));
    assert!(custom.files.contains(&app_path("dist/components/my-card.js")));

    let collection = results.output(OutputTargetKind::Collection).unwrap();
    assert!(collection
        .files
        .contains(&app_path("dist/collection/collection-manifest.json")));

    for output in &results.outputs {
        for file in &output.files {
            assert!(
                project.sys.access(file),
                "{} listed but not written",
                file.display()
            );
        }
    }
}

/// SCENARIO: The collection manifest lists every component
#[test]
fn scenario_collection_manifest() {
    let project = library();
    project.compiler.build();

    let manifest: serde_json::Value = serde_json::from_str(
        &project
            .read("dist/collection/collection-manifest.json")
            .expect("manifest written"),
    )
    .unwrap();

    let tags: Vec<&str> = manifest["components"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["tagName"].as_str())
        .collect();
    assert_eq!(tags, vec!["my-button", "my-card"]);
}

/// SCENARIO: Outputs are buffered until the build commits
#[test]
fn scenario_outputs_are_written_at_commit() {
    let project = library();
    let seen_during_build = Arc::new(Mutex::new(None));
    let sys = project.sys.clone();
    let sink = seen_during_build.clone();
    project
        .compiler
        .on(CompilerEventName::BuildLog, move |_| {
            let mut seen = sink.lock().unwrap();
            if seen.is_none() {
                *seen = Some(sys.access(&app_path("dist/components/my-button.js")));
            }
        });

    project.compiler.build();

    assert_eq!(*seen_during_build.lock().unwrap(), Some(false));
    assert!(project.exists("dist/components/my-button.js"));
}
