//! Error types for Kiln
//!
//! Library code returns `KilnResult`; the binary wraps these in `anyhow`.
//! Build problems that belong to the user's sources are never errors here,
//! they are [`Diagnostic`](crate::domain::entities::Diagnostic)s.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::ports::SysError;

/// Result type alias for Kiln operations
pub type KilnResult<T> = Result<T, KilnError>;

/// Main error type for Kiln operations
#[derive(Error, Debug)]
pub enum KilnError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing store error
    #[error(transparent)]
    Sys(#[from] SysError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// kiln.toml could not be parsed
    #[error("invalid config file {file}: {message}")]
    Toml { file: PathBuf, message: String },

    /// Config validation produced error-level diagnostics
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The program engine failed to create or emit a program
    #[error("program error: {0}")]
    Program(String),

    /// A bundler or plugin failed
    #[error("bundle '{bundle}' failed: {message}")]
    Bundle { bundle: String, message: String },

    /// The watcher could not be started or was misused
    #[error("watch error: {0}")]
    Watch(String),

    /// A file the build depends on is missing
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },
}

impl KilnError {
    pub fn bundle(bundle: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Bundle {
            bundle: bundle.into(),
            message: message.into(),
        }
    }
}
