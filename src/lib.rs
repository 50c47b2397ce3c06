//! Kiln - incremental build core for web component compilers
//!
//! Kiln orchestrates one build cycle at a time over a write-buffered virtual
//! file system: program analysis, transpilation, module-map upkeep and
//! per-target output generation, with a debounced watch loop on top.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

// Re-exports for convenience
pub use application::{
    BuildEvents, Compiler, CompilerContext, CompilerEvent, CompilerEventName, InMemoryFileSystem,
    Subscription, WatchPhase, Watcher, WatcherCloseResults, WatcherHandle,
};
pub use config::Config;
pub use domain::entities::{BuildOutput, BuildResults, Diagnostic, FsWatchResults};
pub use domain::ports::{CompilerSystem, FileWatchKind};
pub use domain::value_objects::{OutputTarget, OutputTargetKind};
pub use error::{KilnError, KilnResult};
pub use infrastructure::{DiskSystem, MemorySystem};
