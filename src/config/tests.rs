//! Tests for the config module

use super::loader::*;
use super::types::*;
use super::validate::validate_config;
use crate::domain::entities::DiagnosticLevel;
use crate::domain::value_objects::{OutputTarget, OutputTargetKind};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.namespace, "App");
    assert_eq!(config.src_dir, PathBuf::from("src"));
    assert!(config.dev_mode);
    assert!(!config.validate_types);
    assert_eq!(
        config.output_targets,
        vec![OutputTarget::Lazy {
            dir: PathBuf::from("www/build")
        }]
    );
}

#[test]
fn test_config_parse_toml() {
    let toml = r#"
namespace = "Shop"
validate_types = true

[[output_targets]]
type = "collection"
dir = "dist/collection"

[[output_targets]]
type = "custom-element"
dir = "dist/components"

[watch]
file_watch_timeout_ms = 120

[logging]
level = "debug"
"#;

    let config: Config = toml::from_str(toml).unwrap();

    assert_eq!(config.namespace, "Shop");
    assert!(config.validate_types);
    assert_eq!(config.output_targets.len(), 2);
    assert_eq!(config.output_targets[1].kind(), OutputTargetKind::CustomElement);
    assert_eq!(config.watch.file_watch_timeout_ms, Some(120));
    assert_eq!(config.logging.level, LogLevel::Debug);
    // unset keys keep their defaults
    assert_eq!(config.cache_dir, PathBuf::from(".kiln"));
}

#[test]
fn test_fs_namespace_derived_from_namespace() {
    let config = Config::default().with_namespace("MyApp");
    assert_eq!(config.fs_namespace(), "myapp");
}

#[test]
fn test_file_watch_timeout_falls_back_to_system_default() {
    let config = Config::default();
    assert_eq!(
        config.file_watch_timeout(Duration::from_millis(32)),
        Duration::from_millis(32)
    );

    let config = config.with_file_watch_timeout(Duration::from_millis(5));
    assert_eq!(
        config.file_watch_timeout(Duration::from_millis(32)),
        Duration::from_millis(5)
    );
}

#[test]
fn test_log_level_parse() {
    assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
    assert_eq!(LogLevel::parse(" trace "), Some(LogLevel::Trace));
    assert_eq!(LogLevel::parse("loud"), None);
}

#[test]
fn test_load_with_warnings_reports_unknown_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kiln.toml");
    fs::write(&path, "namespace = \"X\"\nnamspace_typo = 1\nsrcdir = \"lib\"\n").unwrap();

    let (config, warnings) = load_with_warnings(&path).unwrap();

    assert_eq!(config.namespace, "X");
    assert_eq!(warnings.len(), 2);
    let srcdir = warnings.iter().find(|w| w.key == "srcdir").unwrap();
    assert_eq!(srcdir.suggestion.as_deref(), Some("src_dir"));
    assert_eq!(srcdir.line, Some(3));
}

#[test]
fn test_load_with_warnings_invalid_toml_is_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kiln.toml");
    fs::write(&path, "namespace = [").unwrap();

    let err = load_with_warnings(&path).unwrap_err();
    assert!(err.to_string().contains("kiln.toml"));
}

#[test]
fn test_warning_to_diagnostic() {
    let warning = ConfigWarning {
        key: "srcdir".to_string(),
        file: PathBuf::from("/p/kiln.toml"),
        line: Some(4),
        suggestion: Some("src_dir".to_string()),
    };
    let diagnostic = warning.to_diagnostic();
    assert_eq!(diagnostic.level, DiagnosticLevel::Warn);
    assert_eq!(diagnostic.line, Some(4));
    assert!(diagnostic.message.contains("did you mean 'src_dir'"));
}

#[test]
fn test_load_project_config_without_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let (config, diagnostics) = load_project_config(dir.path()).unwrap();

    assert!(diagnostics.is_empty());
    assert_eq!(config.root_dir, dir.path().join("."));
}

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
        ("KILN_NAMESPACE", "Store"),
        ("KILN_VALIDATE_TYPES", "1"),
        ("KILN_DEV_MODE", "false"),
        ("KILN_FILE_WATCH_TIMEOUT", "250"),
        ("KILN_LOG_LEVEL", "error"),
    ]
    .into_iter()
    .collect();

    let config = apply_env_overrides(Config::default(), |key| {
        env.get(key).map(|v| v.to_string())
    });

    assert_eq!(config.namespace, "Store");
    assert!(config.validate_types);
    assert!(!config.dev_mode);
    assert_eq!(config.watch.file_watch_timeout_ms, Some(250));
    assert_eq!(config.logging.level, LogLevel::Error);
}

#[test]
fn test_env_overrides_ignore_garbage() {
    let config = apply_env_overrides(Config::default(), |key| match key {
        "KILN_FILE_WATCH_TIMEOUT" => Some("soon".to_string()),
        "KILN_NAMESPACE" => Some("   ".to_string()),
        _ => None,
    });

    assert_eq!(config.namespace, "App");
    assert_eq!(config.watch.file_watch_timeout_ms, None);
}

#[test]
fn test_validate_config_resolves_paths() {
    let config = Config::for_root("proj").with_namespace("Shop");
    let (config, diagnostics) = validate_config(config, Path::new("/work"));

    assert!(diagnostics.is_empty());
    assert_eq!(config.root_dir, PathBuf::from("/work/proj"));
    assert_eq!(config.src_dir, PathBuf::from("/work/proj/src"));
    assert_eq!(config.cache_dir, PathBuf::from("/work/proj/.kiln"));
    assert_eq!(config.fs_namespace.as_deref(), Some("shop"));
    assert_eq!(
        config.output_targets[0].dir(),
        Path::new("/work/proj/www/build")
    );
}

#[test]
fn test_validate_config_dedups_targets() {
    let config = Config::for_root("/p").with_output_targets(vec![
        OutputTarget::new(OutputTargetKind::Lazy, "www"),
        OutputTarget::new(OutputTargetKind::Lazy, "./www"),
        OutputTarget::new(OutputTargetKind::Hydrate, "hydrate"),
    ]);
    let (config, _) = validate_config(config, Path::new("/"));

    assert_eq!(config.output_targets.len(), 2);
}

#[test]
fn test_validate_config_rejects_empty_namespace() {
    let config = Config::for_root("/p").with_namespace("  ");
    let (_, diagnostics) = validate_config(config, Path::new("/"));

    assert!(diagnostics
        .iter()
        .any(|d| d.level == DiagnosticLevel::Error && d.message.contains("namespace")));
}

#[test]
fn test_validate_config_out_dir_equal_to_src_is_error() {
    let config = Config::for_root("/p")
        .with_output_targets(vec![OutputTarget::new(OutputTargetKind::Collection, "src")]);
    let (_, diagnostics) = validate_config(config, Path::new("/"));

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].level, DiagnosticLevel::Error);
}

#[test]
fn test_validate_config_warnings() {
    let config = Config::for_root("/p")
        .with_output_targets(vec![OutputTarget::new(OutputTargetKind::Lazy, "src/build")]);
    let (_, diagnostics) = validate_config(config, Path::new("/"));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].level, DiagnosticLevel::Warn);

    let config = Config::for_root("/p").with_output_targets(Vec::new());
    let (_, diagnostics) = validate_config(config, Path::new("/"));
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("no output targets"));
}
