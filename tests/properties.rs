//! Property tests for Kiln.
//!
//! Properties use randomized input generation to explore edge cases and
//! protect invariants like "never panics" and "last write wins".
//!
//! Run with: `cargo test --test properties`

#[path = "properties/path_handling.rs"]
mod path_handling;

#[path = "properties/vfs_commit.rs"]
mod vfs_commit;

#[path = "properties/pending_changes.rs"]
mod pending_changes;

#[path = "properties/source_scan.rs"]
mod source_scan;
