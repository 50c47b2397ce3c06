//! Configuration loading

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::entities::{Diagnostic, DiagnosticCategory};
use crate::error::{KilnError, KilnResult};

use super::types::{Config, LogLevel};

/// Project config file name, looked up in the root directory
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

/// Non-fatal configuration warning (e.g. unknown keys)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl ConfigWarning {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut message = format!("unknown config key '{}'", self.key);
        if let Some(suggestion) = &self.suggestion {
            message.push_str(&format!(", did you mean '{}'?", suggestion));
        }
        let diagnostic = Diagnostic::warn(DiagnosticCategory::Config, message).with_file(&self.file);
        match self.line {
            Some(line) => diagnostic.with_location(line, 1),
            None => diagnostic,
        }
    }
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> KilnResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| KilnError::Toml {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key: key.clone(),
                file: path.to_path_buf(),
                line: find_line_number(&content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Load `<root>/kiln.toml` when present, defaults otherwise, then apply
/// environment overrides. Unknown keys come back as warnings.
pub fn load_project_config(root: &Path) -> KilnResult<(Config, Vec<Diagnostic>)> {
    let file = root.join(CONFIG_FILE_NAME);
    let (mut config, warnings) = if file.is_file() {
        load_with_warnings(&file)?
    } else {
        (Config::default(), Vec::new())
    };

    // relative roots in the file are relative to the file's directory
    config.root_dir = if config.root_dir.is_absolute() {
        config.root_dir
    } else {
        root.join(&config.root_dir)
    };

    let diagnostics = warnings.iter().map(ConfigWarning::to_diagnostic).collect();
    Ok((with_env_overrides(config), diagnostics))
}

/// Apply environment variable overrides (KILN_* prefix)
pub fn with_env_overrides(config: Config) -> Config {
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from any key lookup
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    // KILN_NAMESPACE
    if let Some(namespace) = lookup("KILN_NAMESPACE") {
        if !namespace.trim().is_empty() {
            config.namespace = namespace.trim().to_string();
        }
    }

    // KILN_VALIDATE_TYPES
    if let Some(val) = lookup("KILN_VALIDATE_TYPES") {
        config.validate_types = parse_flag(&val);
    }

    // KILN_DEV_MODE
    if let Some(val) = lookup("KILN_DEV_MODE") {
        config.dev_mode = parse_flag(&val);
    }

    // KILN_FILE_WATCH_TIMEOUT (milliseconds)
    if let Some(val) = lookup("KILN_FILE_WATCH_TIMEOUT") {
        if let Ok(ms) = val.trim().parse::<u64>() {
            config.watch.file_watch_timeout_ms = Some(ms);
        }
    }

    // KILN_LOG_LEVEL
    if let Some(level) = lookup("KILN_LOG_LEVEL").as_deref().and_then(LogLevel::parse) {
        config.logging.level = level;
    }

    config
}

fn parse_flag(val: &str) -> bool {
    let val = val.trim().to_ascii_lowercase();
    val != "false" && val != "0" && val != "no" && !val.is_empty()
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.contains(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "root_dir",
        "src_dir",
        "cache_dir",
        "namespace",
        "fs_namespace",
        "global_script",
        "program_config",
        "core_import_path",
        "validate_types",
        "dev_mode",
        "types_short_circuit",
        "sourcemap",
        "output_targets",
        "type",
        "dir",
        "watch",
        "file_watch_timeout_ms",
        "logging",
        "level",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
