//! Configuration type definitions

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::OutputTarget;
use crate::error::KilnResult;

use super::loader;

/// Runtime import the decorator transform rewrites `@kiln/core` to
pub const DEFAULT_CORE_IMPORT_PATH: &str = "@kiln/core/internal/client";

/// Watch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WatchConfig {
    /// Quiet period before a rebuild; the system's default when unset
    #[serde(default)]
    pub file_watch_timeout_ms: Option<u64>,
}

/// Log verbosity used by the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

/// Main configuration structure (`kiln.toml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root_dir: PathBuf,
    pub src_dir: PathBuf,
    /// Transpiled modules land here
    pub cache_dir: PathBuf,
    pub namespace: String,
    /// Lowercase namespace used for file names; derived when unset
    pub fs_namespace: Option<String>,
    pub global_script: Option<PathBuf>,
    /// Program config JSON; a fallback is generated in watch mode when unset
    pub program_config: Option<PathBuf>,
    pub core_import_path: String,
    /// Compute semantic diagnostics at the end of every build
    pub validate_types: bool,
    pub dev_mode: bool,
    /// Stop after declaration regeneration when the public types changed
    pub types_short_circuit: bool,
    pub sourcemap: bool,
    pub output_targets: Vec<OutputTarget>,
    pub watch: WatchConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            src_dir: PathBuf::from("src"),
            cache_dir: PathBuf::from(".kiln"),
            namespace: "App".to_string(),
            fs_namespace: None,
            global_script: None,
            program_config: None,
            core_import_path: DEFAULT_CORE_IMPORT_PATH.to_string(),
            validate_types: false,
            dev_mode: true,
            types_short_circuit: false,
            sourcemap: false,
            output_targets: vec![OutputTarget::Lazy {
                dir: PathBuf::from("www/build"),
            }],
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> KilnResult<Self> {
        loader::load_with_warnings(path).map(|(config, _warnings)| config)
    }

    /// Defaults rooted at `root`
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root.into(),
            ..Self::default()
        }
    }

    pub fn with_root_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_dir = root.into();
        self
    }

    pub fn with_src_dir(mut self, src: impl Into<PathBuf>) -> Self {
        self.src_dir = src.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_output_targets(mut self, targets: Vec<OutputTarget>) -> Self {
        self.output_targets = targets;
        self
    }

    pub fn with_global_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_script = Some(path.into());
        self
    }

    pub fn with_program_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.program_config = Some(path.into());
        self
    }

    pub fn with_validate_types(mut self, validate: bool) -> Self {
        self.validate_types = validate;
        self
    }

    pub fn with_dev_mode(mut self, dev: bool) -> Self {
        self.dev_mode = dev;
        self
    }

    pub fn with_types_short_circuit(mut self, enabled: bool) -> Self {
        self.types_short_circuit = enabled;
        self
    }

    pub fn with_file_watch_timeout(mut self, timeout: Duration) -> Self {
        self.watch.file_watch_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn fs_namespace(&self) -> String {
        self.fs_namespace
            .clone()
            .unwrap_or_else(|| self.namespace.to_ascii_lowercase())
    }

    /// Configured debounce, or the backing system's default
    pub fn file_watch_timeout(&self, system_default: Duration) -> Duration {
        self.watch
            .file_watch_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(system_default)
    }

    /// Generated public type surface
    pub fn app_types_path(&self) -> PathBuf {
        self.src_dir.join("components.d.ts")
    }

    /// The app's own index module, re-exported by the user index entry
    pub fn user_index_path(&self) -> PathBuf {
        self.src_dir.join("index.ts")
    }

    pub fn index_html_path(&self) -> PathBuf {
        self.src_dir.join("index.html")
    }

    pub fn fallback_program_config_path(&self) -> PathBuf {
        self.root_dir.join("program.fallback.json")
    }

    pub fn package_json_path(&self) -> PathBuf {
        self.root_dir.join("package.json")
    }
}
