//! Scenario: First Build From the Command Line
//!
//! Journey: A developer runs `kiln build` in a fresh project.
//!
//! Steps:
//! 1. Project has components under `src/`
//! 2. `kiln build` transpiles, bundles and writes every output
//! 3. A broken source file fails the build with exit code 1
//!
//! Success Criteria:
//! - Outputs land on disk only after a successful build
//! - Errors are reported and reflected in the exit code
//! - `--json` keeps stdout machine-readable

use crate::common::*;

/// SCENARIO: Fresh project builds and writes lazy bundles
#[test]
fn scenario_build_writes_outputs() {
    let project = DiskProject::new();
    project
        .write("src/my-button.tsx", MY_BUTTON)
        .write("src/my-card.tsx", MY_CARD);

    let result = project.run(&["build"]);

    assert!(
        result.success,
        "build should succeed.\nOutput:\n{}",
        result.combined_output()
    );
    for file in [
        "www/build/my-button.entry.js",
        "www/build/my-card.entry.js",
        "src/components.d.ts",
    ] {
        assert!(
            project.path(file).exists(),
            "expected {} to exist.\nFiles:\n{}",
            file,
            list_all_files(project.root.path()).join("\n")
        );
    }

    let types = project.read("src/components.d.ts");
    assert!(types.contains("my-button"));
    assert!(types.contains("my-card"));
    assert!(result.stdout.contains("finished"));
}

/// SCENARIO: A syntax error fails the build without writing outputs
#[test]
fn scenario_syntax_error_fails_build() {
    let project = DiskProject::new();
    project
        .write("src/my-button.tsx", MY_BUTTON)
        .write("src/broken.ts", BROKEN);

    let result = project.run(&["build"]);

    assert_eq!(result.exit_code, 1, "{}", result.combined_output());
    assert!(result.stdout.contains("Syntax Error"));
    assert!(!project.path("www/build").exists());
}

/// SCENARIO: `--json` prints one JSON object per line
#[test]
fn scenario_json_output_is_ndjson() {
    let project = DiskProject::new();
    project.write("src/my-button.tsx", MY_BUTTON);

    let result = project.run(&["build", "--json"]);
    assert!(result.success, "{}", result.combined_output());

    let events: Vec<serde_json::Value> = result
        .stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON: {} ({})", l, e)))
        .collect();
    let names: Vec<&str> = events.iter().filter_map(|e| e["event"].as_str()).collect();

    assert!(names.contains(&"buildStart"));
    assert!(names.contains(&"buildFinish"));
    assert_eq!(names.last(), Some(&"buildSummary"));
    assert!(events.iter().all(|e| e["command"] == "kiln"));
}

/// SCENARIO: Project config picks the output targets
#[test]
fn scenario_project_config_selects_targets() {
    let project = DiskProject::new();
    project.write("src/my-button.tsx", MY_BUTTON).write(
        "kiln.toml",
        r#"namespace = "Shop"

[[output_targets]]
type = "custom-element"
dir = "dist/components"
"#,
    );

    let result = project.run(&["build", "--prod"]);

    assert!(result.success, "{}", result.combined_output());
    assert!(project.path("dist/components/my-button.js").exists());
    assert!(!project.path("www").exists());
}
