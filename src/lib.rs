//! # tristore - An embeddable RDF triple store
//!
//! tristore is a mutable set-of-triples engine with pattern-matching queries,
//! change notification to observers, safe iteration under concurrent mutation,
//! and transparent off-heap storage of oversized literal values keyed by
//! content hash.
//!
//! ## Core Concepts
//!
//! - **Term**: An RDF node - IRI, blank node, or literal
//! - **Triple**: An atomic (subject, predicate, object) statement
//! - **GraphStore**: The store contract - filter, add, remove, observe
//! - **TriplePattern**: A wildcard template selecting triples or events
//! - **LiteralStash**: Content-addressed on-disk storage for large literals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tristore::{Iri, Literal, MemoryGraph, Triple, TriplePattern};
//! use tristore::graph::GraphStore;
//!
//! let graph = MemoryGraph::new();
//! let triple = Triple::builder()
//!     .subject(Iri::new("http://example.com/alice")?)
//!     .predicate(Iri::new("http://example.com/knows")?)
//!     .object(Literal::plain("Bob"))
//!     .build()?;
//!
//! graph.add(triple.clone())?;
//! assert!(graph.contains(&triple)?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core value types
pub mod error;
pub mod pattern;
pub mod term;
pub mod triple;
pub mod vocab;

// Events, collection core, and concrete stores
pub mod event;
pub mod graph;
pub mod store;

// Re-export primary types at crate root for convenience
pub use error::{GraphError, GraphResult, StorageError, ValidationError};
pub use event::{
    EventKind, GraphEvent, GraphListener, ListenerId, ListenerRegistry, ManualScheduler, Scheduler,
    ThreadScheduler,
};
pub use graph::{Cursor, GraphId, GraphLock, GraphStore, TripleCursor};
pub use pattern::TriplePattern;
pub use store::{ExternalizedGraph, LiteralStash, MemoryGraph};
pub use term::{BlankNode, Iri, Literal, Subject, Term};
pub use triple::{Triple, TripleBuilder};
