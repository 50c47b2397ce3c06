//! Program port - the incremental parsing/type-checking engine boundary
//!
//! A `ProgramEngine` turns a program config plus a `ProgramHost` into a
//! `Program`. Handing the previous program back in makes the engine
//! incremental: it reports what changed and reuses unchanged work. All of
//! the engine's file access goes through the host, which the build core
//! backs with the VFS.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::entities::{Diagnostic, FsWatchResults};
use crate::error::KilnResult;

/// File access the engine is allowed to use
pub trait ProgramHost: Send + Sync {
    fn read_file(&self, path: &Path) -> Option<String>;
    fn file_exists(&self, path: &Path) -> bool;
    /// Files (not directories) below `dir`
    fn read_directory(&self, dir: &Path, recursive: bool) -> Vec<PathBuf>;
    fn write_file(&self, path: &Path, content: &str) -> KilnResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: Arc<str>,
    /// Content hash; equal versions mean equal text
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOptions {
    pub root_dir: PathBuf,
    pub src_dir: PathBuf,
    /// Where emitted modules are written
    pub out_dir: PathBuf,
}

/// A transform stage run on module text during emit
pub trait SourceTransform: Send + Sync {
    fn name(&self) -> &'static str;
    fn transform(&self, file: &SourceFile, code: String, diagnostics: &mut Vec<Diagnostic>) -> String;
}

/// Transforms run before and after the engine's own lowering
#[derive(Clone, Default)]
pub struct CustomTransformers {
    pub before: Vec<Arc<dyn SourceTransform>>,
    pub after: Vec<Arc<dyn SourceTransform>>,
}

impl CustomTransformers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(mut self, transform: Arc<dyn SourceTransform>) -> Self {
        self.before.push(transform);
        self
    }

    pub fn after(mut self, transform: Arc<dyn SourceTransform>) -> Self {
        self.after.push(transform);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmitResult {
    /// Source files that produced output
    pub emitted: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    /// Nothing was written because of errors
    pub emit_skipped: bool,
}

/// Module resolution and export lookup for downstream analysis
pub trait TypeResolver: Send + Sync {
    fn resolve_module(&self, importer: &Path, specifier: &str) -> Option<PathBuf>;
    fn exported_symbols(&self, file: &Path) -> Vec<String>;
}

pub trait Program: Send + Sync {
    fn options(&self) -> &ProgramOptions;

    fn root_files(&self) -> Vec<PathBuf>;

    fn source_files(&self) -> Vec<SourceFile>;

    fn source_file(&self, path: &Path) -> Option<SourceFile>;

    /// Files added, updated or deleted relative to the previous program
    fn changes(&self) -> FsWatchResults;

    /// Changed files plus everything that transitively imports them
    fn affected_files(&self) -> Vec<PathBuf>;

    /// Computed on first request
    fn syntactic_diagnostics(&self) -> Vec<Diagnostic>;

    /// Computed on first request
    fn semantic_diagnostics(&self) -> Vec<Diagnostic>;

    /// Emit `target`, or every affected file when `None`
    fn emit(
        &self,
        target: Option<&Path>,
        transformers: &CustomTransformers,
        write: &mut dyn FnMut(&Path, &str),
        emit_only_dts: bool,
    ) -> EmitResult;

    fn type_resolver(&self) -> &dyn TypeResolver;

    fn as_any(&self) -> &dyn Any;

    /// Emit one file and hand back its JS instead of writing it
    fn emit_to_string(
        &self,
        target: &Path,
        transformers: &CustomTransformers,
    ) -> (Option<String>, Vec<Diagnostic>) {
        let mut captured = None;
        let result = self.emit(
            Some(target),
            transformers,
            &mut |path: &Path, text: &str| {
                if path.extension().is_some_and(|ext| ext == "js") {
                    captured = Some(text.to_string());
                }
            },
            false,
        );
        (captured, result.diagnostics)
    }
}

pub trait ProgramEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build a program; `config_path` points at the program config JSON
    fn create_program(
        &self,
        config_path: Option<&Path>,
        options: &ProgramOptions,
        host: &dyn ProgramHost,
        previous: Option<&Arc<dyn Program>>,
    ) -> KilnResult<Arc<dyn Program>>;
}
