//! Compiler Factory
//!
//! Creates a `Compiler` with its infrastructure wired up. This is the
//! dependency injection point for the binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::Compiler;
use crate::config::{load_project_config, Config};
use crate::domain::entities::Diagnostic;
use crate::domain::ports::CompilerSystem;
use crate::error::KilnResult;
use crate::infrastructure::{create_system, SystemKind};

/// Command-line settings layered over the project config
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub validate_types: Option<bool>,
    pub dev_mode: Option<bool>,
    pub sourcemap: Option<bool>,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(validate) = self.validate_types {
            config.validate_types = validate;
        }
        if let Some(dev) = self.dev_mode {
            config.dev_mode = dev;
        }
        if let Some(sourcemap) = self.sourcemap {
            config.sourcemap = sourcemap;
        }
        config
    }
}

/// Load `<root>/kiln.toml`, apply overrides and build a compiler on the
/// system selected by the environment
///
/// The returned diagnostics are the non-fatal ones from loading and
/// validation, for the caller to print.
pub fn create_compiler(
    root: &Path,
    overrides: &ConfigOverrides,
) -> KilnResult<(Compiler, Vec<Diagnostic>)> {
    create_compiler_with_system(root, overrides, create_system(SystemKind::detect()))
}

pub fn create_compiler_with_system(
    root: &Path,
    overrides: &ConfigOverrides,
    sys: Arc<dyn CompilerSystem>,
) -> KilnResult<(Compiler, Vec<Diagnostic>)> {
    let root = absolute_root(root, sys.as_ref());
    let (config, mut diagnostics) = load_project_config(&root)?;
    let compiler = Compiler::new(overrides.apply(config), sys)?;
    diagnostics.extend(compiler.config_diagnostics().iter().cloned());
    Ok((compiler, diagnostics))
}

fn absolute_root(root: &Path, sys: &dyn CompilerSystem) -> PathBuf {
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        sys.current_directory().join(root)
    }
}
