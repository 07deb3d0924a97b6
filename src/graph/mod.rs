//! The triple-collection core: store contract, cursors, and locking.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store contract and cursor wrapper.
pub mod core;

pub use self::core::{Cursor, GraphStore, TripleCursor};

/// Identifier of one triple collection instance.
///
/// Events carry this instead of a reference to the originating collection;
/// graph "equality" in the identity sense is `GraphId` equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(Uuid);

impl GraphId {
    /// Creates a new random graph ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse advisory read/write lock of a collection.
///
/// Callers may hold a guard across multiple store calls for multi-step read
/// or write consistency. The lock is advisory: single operations are already
/// thread-safe through the store's internal locking, and nothing forces other
/// callers to take this lock first.
#[derive(Clone, Default)]
pub struct GraphLock {
    inner: Arc<RwLock<()>>,
}

impl fmt::Debug for GraphLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphLock").finish_non_exhaustive()
    }
}

impl GraphLock {
    /// Creates an unlocked lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the shared read side, blocking until available.
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        // The lock guards no data, so poisoning carries no torn state.
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the exclusive write side, blocking until available.
    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
