//! Watch mode
//!
//! - `state` - coalescing window of pending changes
//! - `shim` - filters watch callbacks and feeds the window and the event bus
//! - `scheduler` - the blocking watch loop, one build in flight at a time

mod scheduler;
mod shim;
mod state;


pub use scheduler::{WatchPhase, Watcher, WatcherCloseResults, WatcherHandle};
pub use shim::{FileWatchShim, WatchFilter, WatchSignal};
pub use state::PendingChanges;
