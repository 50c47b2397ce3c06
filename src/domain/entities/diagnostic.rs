//! Build diagnostics
//!
//! Every phase of a build appends to one flat, ordered list of diagnostics.
//! The presence of an error-level entry is the only "build failed" signal.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warn,
    Info,
}

impl DiagnosticLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
        }
    }
}

/// Which subsystem produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    Syntax,
    Type,
    Config,
    Bundler,
    Runtime,
    Internal,
}

impl DiagnosticCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Type => "type",
            Self::Config => "config",
            Self::Bundler => "bundler",
            Self::Runtime => "runtime",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub category: DiagnosticCategory,
    pub header: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Diagnostic {
    pub fn new(
        level: DiagnosticLevel,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        let header = match category {
            DiagnosticCategory::Syntax => "Syntax Error",
            DiagnosticCategory::Type => "Type Error",
            DiagnosticCategory::Config => "Config Error",
            DiagnosticCategory::Bundler => "Bundling Error",
            DiagnosticCategory::Runtime => "Runtime Error",
            DiagnosticCategory::Internal => "Internal Error",
        };
        Self {
            level,
            category,
            header: header.to_string(),
            message: message.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    pub fn error(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, category, message)
    }

    pub fn warn(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, category, message)
    }

    pub fn info(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, category, message)
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Attach a 1-based line/column location
    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level.as_str(), self.header, self.message)?;
        if let Some(file) = &self.file {
            write!(f, " ({}", file.display())?;
            if let (Some(line), Some(column)) = (self.line, self.column) {
                write!(f, ":{}:{}", line, column)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// True when any diagnostic is error-level
pub fn has_error(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Convert an unexpected failure into a single internal error diagnostic
pub fn catch_error(diagnostics: &mut Vec<Diagnostic>, err: impl fmt::Display) {
    diagnostics.push(Diagnostic::error(DiagnosticCategory::Internal, err.to_string()));
}

/// Render a captured panic payload the way `catch_error` expects it
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("unexpected panic: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("unexpected panic: {}", msg)
    } else {
        "unexpected panic".to_string()
    }
}
