//! CompilerSystem implementations and startup selection
//!
//! The system is chosen once, at startup, and injected into the compiler.
//! Nothing below the facade asks which one it got.

mod disk;
mod memory;

use std::sync::Arc;

pub use disk::{map_notify_event, DiskSystem};
pub use memory::MemorySystem;

use crate::domain::ports::CompilerSystem;

/// Environment variable that forces a system kind
pub const SYS_ENV_VAR: &str = "KILN_SYS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemKind {
    Disk,
    Memory,
}

impl SystemKind {
    /// Pick the system for this process
    pub fn detect() -> Self {
        Self::from_env_value(std::env::var(SYS_ENV_VAR).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("memory") | Some("mem") | Some("in-memory") => SystemKind::Memory,
            _ => SystemKind::Disk,
        }
    }
}

pub fn create_system(kind: SystemKind) -> Arc<dyn CompilerSystem> {
    match kind {
        SystemKind::Disk => Arc::new(DiskSystem::new()),
        SystemKind::Memory => Arc::new(MemorySystem::new()),
    }
}
