//! Common test utilities for Kiln scenario and property tests.
//!
//! This module provides:
//! - `MemoryProject`: a compiler over an in-memory system, no disk involved
//! - `DiskProject`: a temp project directory plus helpers to run the binary
//! - Fixtures: Reusable component sources

#![allow(dead_code)]

pub mod fixtures;
pub mod project;

pub use fixtures::*;
pub use project::*;
