//! Headless testing support: in-memory collaborators and snapshot helpers.
//!
//! Use [`MemorySink`] and [`MemoryBridge`] in place of the host editor, and
//! [`lines_to_string`] / [`patch_to_string`] to capture output as plain text
//! for snapshot-style assertions.

pub mod memory;
pub mod snapshot;

pub use memory::{MemoryBridge, MemorySink};
pub use snapshot::{lines_to_string, patch_to_string, render_to_string, render_with};
