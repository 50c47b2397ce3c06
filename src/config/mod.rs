//! Configuration module for Kiln
//!
//! Precedence, highest first:
//! 1. CLI flags
//! 2. Environment variables (KILN_*)
//! 3. Project config (`<root>/kiln.toml`)
//! 4. Built-in defaults

mod loader;
#[cfg(test)]
mod tests;
mod types;
mod validate;

pub use loader::{
    apply_env_overrides, load_project_config, load_with_warnings, with_env_overrides,
    ConfigWarning, CONFIG_FILE_NAME,
};
pub use types::{
    Config, LogLevel, LoggingConfig, WatchConfig, DEFAULT_CORE_IMPORT_PATH,
};
pub use validate::validate_config;
