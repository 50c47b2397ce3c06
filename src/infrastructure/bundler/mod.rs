//! Built-in bundler

mod graph;

pub use graph::{entry_map, GraphBundler};
