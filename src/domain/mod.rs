//! Domain Layer
//!
//! The vocabulary of the build core, without I/O.
//!
//! ## Structure
//!
//! - `entities/` - Diagnostics, module/component/collection metadata, build results
//! - `value_objects/` - Normalized paths, output targets
//! - `services/` - Lexical scanning of emitted modules
//! - `ports/` - Interfaces for the backing store, the program engine and the bundler
//!
//! ## Design Principles
//!
//! 1. **No I/O** - This layer never touches the file system directly
//! 2. **Ports & Adapters** - All I/O goes through trait-defined ports
//! 3. **One system** - Environment differences live behind `CompilerSystem`

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
