//! Concrete triple-store backends.

/// Decorator offloading binary literals to content-addressed files.
pub mod externalized;
/// In-memory hash-set store.
pub mod memory;

pub use externalized::{ExternalizedGraph, LiteralStash};
pub use memory::MemoryGraph;
