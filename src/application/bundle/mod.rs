//! Bundling glue between the build and the [`Bundler`](crate::domain::ports::Bundler) port
//!
//! - `plugins` - virtual modules and the program/VFS/node resolution plugins
//! - `bundle_output` - plugin chain assembly, bundling and chunk writes

pub mod bundle_output;
pub mod plugins;

pub use bundle_output::{
    bundle_output, component_entries, global_scripts, plugin_pipeline, write_chunks,
};
pub use plugins::{
    ComponentEntry, APP_DATA_ID, HYDRATE_ENTRY_ID, LAZY_BROWSER_ID, LAZY_ENTRY_PREFIX,
    LAZY_EXTERNAL_ID, USER_INDEX_ID,
};
