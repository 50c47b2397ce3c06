//! Application Layer
//!
//! Orchestration of build cycles over the domain ports.
//! This layer:
//! - Depends on Domain layer (entities, ports, value objects)
//! - Owns all mutable compiler state (VFS, module map, caches, event bus)
//! - Defaults to the built-in Infrastructure engine and bundler
//!
//! ## Pieces
//!
//! - `fs` - Write-buffering VFS over a `CompilerSystem`
//! - `compiler_ctx` - Per-compiler state shared by every build
//! - `program_host` - Program config and incremental program updates
//! - `build` - One build cycle, phase by phase
//! - `bundle` / `output_targets` - Per-target output generation
//! - `watch` - Debounced rebuild scheduling
//! - `compiler` - The `Compiler` facade

pub mod build;
pub mod bundle;
pub mod compiler;
pub mod compiler_ctx;
pub mod events;
pub mod fs;
pub mod output_targets;
pub mod program_host;
pub mod resolver;
pub mod watch;

pub use build::{BuildRequest, BuildRunner};
pub use compiler::Compiler;
pub use compiler_ctx::CompilerContext;
pub use events::{BuildEvents, CompilerEvent, CompilerEventName, Subscription};
pub use fs::{CommitEntry, InMemoryFileSystem, ReadOptions, WriteOptions, WriteResult};
pub use output_targets::generate_outputs;
pub use program_host::{ensure_program_config, WatchProgram};
pub use resolver::ModuleResolver;
pub use watch::{WatchPhase, Watcher, WatcherCloseResults, WatcherHandle};
