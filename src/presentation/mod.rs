//! Presentation Layer
//!
//! This layer handles:
//! - Wiring a `Compiler` from the project config and the environment
//! - Output formatting (text/JSON)
//!
//! ## Structure
//!
//! - `factory` - Creates compilers with proper dependencies (dependency injection)
//! - `output` - Output rendering abstractions
//!
//! ## Usage
//!
//! ```ignore
//! use kiln::presentation::{create_compiler, ConfigOverrides};
//!
//! let (compiler, _warnings) = create_compiler(Path::new("."), &ConfigOverrides::default())?;
//! let results = compiler.build();
//! ```

pub mod factory;
pub mod output;

pub use factory::{create_compiler, create_compiler_with_system, ConfigOverrides};
pub use output::{create_renderer, BuildResultRenderer, JsonRenderer, OutputFormat, TextRenderer};
