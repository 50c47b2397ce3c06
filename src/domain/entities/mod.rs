//! Domain entities
//!
//! Data that flows between the build phases. Entities carry no I/O.

mod build_result;
mod diagnostic;
mod module_meta;

pub use build_result::{BuildOutput, BuildResults, FsWatchResults};
pub use diagnostic::{
    catch_error, has_error, panic_message, Diagnostic, DiagnosticCategory, DiagnosticLevel,
};
pub use module_meta::{
    CollectionComponent, CollectionManifest, CollectionMeta, CompilerInfo, ComponentMeta, ModuleMeta,
};
