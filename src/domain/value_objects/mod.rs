//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod hash;
mod output_target;
pub mod path;

pub use hash::ContentHash;
pub use output_target::{OutputTarget, OutputTargetKind};
pub use path::{normalize_path, relative_to, resolve_path};
