//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the build core.
//! Infrastructure layer provides concrete implementations.

pub mod bundler;
pub mod compiler_system;
pub mod program;

pub use bundler::{
    BundleBuild, BundleCache, BundleOutput, BundleRequest, Bundler, CachedModule, OutputChunk,
    OutputOptions, Plugin, PluginPipeline, ResolvedId, TransformResult,
};
pub use compiler_system::{
    CompilerSystem, FileWatchCallback, FileWatchKind, FsStats, SysError, SysResult, WatchHandle,
};
pub use program::{
    CustomTransformers, EmitResult, Program, ProgramEngine, ProgramHost, ProgramOptions,
    SourceFile, SourceTransform, TypeResolver,
};
