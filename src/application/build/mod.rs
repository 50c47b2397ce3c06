//! Build pipeline
//!
//! `BuildRunner` drives one pass through the phases below; each phase is a
//! free function over the shared [`CompilerContext`](crate::application::compiler_ctx::CompilerContext)
//! and the per-build [`BuildContext`].
//!
//! - `changes` - change classification and the spurious-change filter
//! - `transpile` - program emit into the VFS write buffer
//! - `metadata` - module map and component dependency graph
//! - `app_types` - `components.d.ts`
//! - `conditionals` - `BUILD` feature flags for bundles
//! - `transforms` - source transforms plugged into emit

mod app_types;
mod build_ctx;
mod changes;
mod conditionals;
mod metadata;
mod runner;
mod transforms;
mod transpile;

pub use app_types::{generate_app_types, render_app_types};
pub use build_ctx::{BuildContext, BuildRequest, TimeSpan};
pub use changes::{collect_changes, ChangeSummary};
pub use conditionals::BuildFeatures;
pub use metadata::{resolve_component_dependencies, update_module_map};
pub use runner::BuildRunner;
pub use transforms::{
    transpile_transformers, DecoratorsToStatic, LazyComponent, NativeComponent, UpdateCoreImports,
    CORE_SPECIFIER,
};
pub use transpile::transpile;
