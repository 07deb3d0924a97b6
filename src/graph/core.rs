//! The store contract shared by every concrete triple collection.
//!
//! Concrete stores implement the three `perform_*` hooks plus `size`; the
//! provided methods wrap them once with event dispatch, `contains`-via-filter,
//! and element-wise bulk removal.

use crate::error::GraphResult;
use crate::event::{GraphEvent, ListenerRegistry};
use crate::pattern::TriplePattern;
use crate::triple::Triple;

use super::{GraphId, GraphLock};

/// A snapshot cursor over a filter result.
///
/// The sequence is materialized when the filter is evaluated; it is finite,
/// restartable by filtering again, and never a live view of mutable store
/// state. `remove_current` removes the last yielded triple from the backing
/// store.
pub trait Cursor: Send {
    /// Yields the next triple of the snapshot, or `None` at the end.
    ///
    /// # Errors
    /// [`crate::GraphError::ConcurrentModification`] if the cursor was
    /// invalidated by a structural change (strict-check stores only).
    fn advance(&mut self) -> GraphResult<Option<Triple>>;

    /// Removes the last triple yielded by [`Cursor::advance`] from the
    /// backing store. Returns true if the store still contained it.
    ///
    /// # Errors
    /// [`crate::GraphError::ConcurrentModification`] on an invalidated
    /// cursor.
    fn remove_current(&mut self) -> GraphResult<bool>;
}

/// A filter result that dispatches a Removed event when its own removal
/// operation is invoked.
///
/// Also usable as an `Iterator` over `GraphResult<Triple>`.
pub struct TripleCursor<'a> {
    inner: Box<dyn Cursor + 'a>,
    registry: &'a ListenerRegistry,
    current: Option<Triple>,
}

impl<'a> TripleCursor<'a> {
    /// Wraps a store hook's cursor with event dispatch.
    #[must_use]
    pub fn new(inner: Box<dyn Cursor + 'a>, registry: &'a ListenerRegistry) -> Self {
        Self {
            inner,
            registry,
            current: None,
        }
    }

    /// Yields the next matching triple.
    ///
    /// # Errors
    /// Propagates cursor invalidation and storage failures.
    pub fn advance(&mut self) -> GraphResult<Option<Triple>> {
        let next = self.inner.advance()?;
        self.current.clone_from(&next);
        Ok(next)
    }

    /// Removes the last yielded triple from the store and, on success,
    /// dispatches a Removed event.
    ///
    /// # Errors
    /// Propagates cursor invalidation and storage failures.
    pub fn remove_current(&mut self) -> GraphResult<bool> {
        let removed = self.inner.remove_current()?;
        if removed {
            if let Some(triple) = self.current.clone() {
                self.registry
                    .dispatch(GraphEvent::removed(self.registry.graph_id(), triple));
            }
        }
        Ok(removed)
    }

    /// Collects the remaining triples of the snapshot.
    ///
    /// # Errors
    /// Propagates the first cursor error.
    pub fn into_vec(mut self) -> GraphResult<Vec<Triple>> {
        let mut triples = Vec::new();
        while let Some(triple) = self.advance()? {
            triples.push(triple);
        }
        Ok(triples)
    }
}

impl Iterator for TripleCursor<'_> {
    type Item = GraphResult<Triple>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().transpose()
    }
}

impl Cursor for TripleCursor<'_> {
    fn advance(&mut self) -> GraphResult<Option<Triple>> {
        TripleCursor::advance(self)
    }

    fn remove_current(&mut self) -> GraphResult<bool> {
        TripleCursor::remove_current(self)
    }
}

/// A mutable, watchable set of triples.
///
/// Implementations provide the `perform_*` hooks; callers use the provided
/// methods, which add event dispatch around every successful mutation.
/// Per-triple operations are linearizable with respect to `size` and
/// `contains`; `remove_all` and `clear` are element-wise and deliberately
/// not atomic as a whole.
pub trait GraphStore: Send + Sync {
    /// Number of triples in the collection.
    fn size(&self) -> usize;

    /// The listener registrations of this collection.
    fn registry(&self) -> &ListenerRegistry;

    /// The advisory read/write lock of this collection.
    fn lock(&self) -> &GraphLock;

    /// Hook: materializes a snapshot of the triples matching `pattern`.
    ///
    /// Implement this instead of [`GraphStore::filter`] so event support
    /// applies to the returned cursor's removal operation.
    ///
    /// # Errors
    /// Storage failures while materializing the snapshot.
    fn perform_filter<'a>(&'a self, pattern: &TriplePattern) -> GraphResult<Box<dyn Cursor + 'a>>;

    /// Hook: inserts a triple. Returns true if it was not already present.
    ///
    /// Implement this instead of [`GraphStore::add`] for event support.
    ///
    /// # Errors
    /// Storage failures while writing.
    fn perform_add(&self, triple: &Triple) -> GraphResult<bool>;

    /// Hook: removes a triple. Returns true if it was present.
    ///
    /// Implement this instead of [`GraphStore::remove`] for event support.
    ///
    /// # Errors
    /// Storage failures while writing.
    fn perform_remove(&self, triple: &Triple) -> GraphResult<bool>;

    /// Identifier of this collection instance.
    fn graph_id(&self) -> GraphId {
        self.registry().graph_id()
    }

    /// Returns true if the collection holds no triples.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Snapshot of the triples matching `pattern`; `None` positions are
    /// wildcards.
    ///
    /// # Errors
    /// Storage failures while materializing the snapshot.
    fn filter(&self, pattern: &TriplePattern) -> GraphResult<TripleCursor<'_>> {
        Ok(TripleCursor::new(
            self.perform_filter(pattern)?,
            self.registry(),
        ))
    }

    /// Snapshot of the whole collection.
    ///
    /// # Errors
    /// Storage failures while materializing the snapshot.
    fn iter(&self) -> GraphResult<TripleCursor<'_>> {
        self.filter(&TriplePattern::any())
    }

    /// Returns true if the collection contains `triple`.
    ///
    /// Defined as the fully bound filter being non-empty.
    ///
    /// # Errors
    /// Storage failures while reading.
    fn contains(&self, triple: &Triple) -> GraphResult<bool> {
        let mut cursor = self.filter(&TriplePattern::of(triple))?;
        Ok(cursor.advance()?.is_some())
    }

    /// Adds a triple. Returns true and dispatches an Added event iff it was
    /// not already present.
    ///
    /// # Errors
    /// Storage failures while writing.
    fn add(&self, triple: Triple) -> GraphResult<bool> {
        let added = self.perform_add(&triple)?;
        if added {
            self.registry()
                .dispatch(GraphEvent::added(self.graph_id(), triple));
        }
        Ok(added)
    }

    /// Removes a triple. Returns true and dispatches a Removed event iff it
    /// was present.
    ///
    /// # Errors
    /// Storage failures while writing.
    fn remove(&self, triple: &Triple) -> GraphResult<bool> {
        let removed = self.perform_remove(triple)?;
        if removed {
            self.registry()
                .dispatch(GraphEvent::removed(self.graph_id(), triple.clone()));
        }
        Ok(removed)
    }

    /// Removes every listed triple, one atomic step and one event each.
    ///
    /// Not atomic as a whole: concurrent readers may observe any subset of
    /// the removals. Returns true if any triple was removed.
    ///
    /// # Errors
    /// Stops at the first storage failure; earlier removals stay applied.
    fn remove_all(&self, triples: &[Triple]) -> GraphResult<bool> {
        let mut modified = false;
        for triple in triples {
            if self.remove(triple)? {
                modified = true;
            }
        }
        Ok(modified)
    }

    /// Removes every triple, element-wise.
    ///
    /// # Errors
    /// Stops at the first storage failure.
    fn clear(&self) -> GraphResult<()> {
        let snapshot = self.iter()?.into_vec()?;
        self.remove_all(&snapshot)?;
        Ok(())
    }
}
