//! Config normalization and validation
//!
//! Turns a loaded [`Config`] into the validated form the compiler works with:
//! every path absolute and normalized, `fs_namespace` filled in, duplicate
//! output targets removed. Problems are reported as `Config` diagnostics; the
//! caller decides whether error-level ones are fatal.

use std::collections::HashSet;
use std::path::Path;

use crate::domain::entities::{Diagnostic, DiagnosticCategory};
use crate::domain::value_objects::{resolve_path, OutputTarget};

use super::types::Config;

pub fn validate_config(mut config: Config, cwd: &Path) -> (Config, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();

    let root = resolve_path(cwd, &config.root_dir);
    config.src_dir = resolve_path(&root, &config.src_dir);
    config.cache_dir = resolve_path(&root, &config.cache_dir);
    config.global_script = config.global_script.map(|p| resolve_path(&root, p));
    config.program_config = config.program_config.map(|p| resolve_path(&root, p));
    config.root_dir = root.clone();

    config.namespace = config.namespace.trim().to_string();
    if config.namespace.is_empty() {
        diagnostics.push(Diagnostic::error(
            DiagnosticCategory::Config,
            "namespace must not be empty",
        ));
    }
    if config.fs_namespace.is_none() {
        config.fs_namespace = Some(config.namespace.to_ascii_lowercase());
    }

    let mut seen = HashSet::new();
    let mut targets: Vec<OutputTarget> = Vec::with_capacity(config.output_targets.len());
    for target in &config.output_targets {
        let target = target.with_dir(resolve_path(&root, target.dir()));
        if seen.insert(target.clone()) {
            targets.push(target);
        }
    }

    for target in &targets {
        if target.dir() == config.src_dir {
            diagnostics.push(Diagnostic::error(
                DiagnosticCategory::Config,
                format!(
                    "{} output directory cannot be the source directory: {}",
                    target.kind(),
                    target.dir().display()
                ),
            ));
        } else if target.dir().starts_with(&config.src_dir) {
            diagnostics.push(Diagnostic::warn(
                DiagnosticCategory::Config,
                format!(
                    "{} output directory is inside the source directory: {}",
                    target.kind(),
                    target.dir().display()
                ),
            ));
        }
    }

    if targets.is_empty() {
        diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Config,
            "no output targets configured, builds will only transpile",
        ));
    }
    config.output_targets = targets;

    (config, diagnostics)
}
