//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `sys/` - CompilerSystem implementations (Disk, Memory)
//! - `program/` - Built-in program engine
//! - `bundler/` - Built-in module-graph bundler
//! - `events/` - Event sinks (NDJSON)

pub mod bundler;
pub mod events;
pub mod program;
pub mod sys;

// Re-export for convenience
pub use bundler::GraphBundler;
pub use events::JsonEventSink;
pub use program::ScriptEngine;
pub use sys::{create_system, DiskSystem, MemorySystem, SystemKind};
