//! In-memory triple store.
//!
//! A deduplicated, unordered set of triples guarded by a single coarse lock
//! for structural mutation and snapshot materialization. Intended for
//! embedded usage, tests, and as the reference implementation of the store
//! contract.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{GraphError, GraphResult};
use crate::event::{ListenerRegistry, Scheduler, ThreadScheduler};
use crate::graph::{Cursor, GraphId, GraphLock, GraphStore};
use crate::pattern::TriplePattern;
use crate::triple::Triple;

/// Thread-safe in-memory triple collection.
///
/// # Iterator invalidation
///
/// The store keeps a monotonically increasing generation counter, bumped on
/// every structural mutation while the backing-set lock is held. Each cursor
/// captures the generation at snapshot time. With strict concurrency
/// checking enabled (off by default, see
/// [`MemoryGraph::set_check_concurrency`]) a cursor whose captured
/// generation went stale fails with
/// [`GraphError::ConcurrentModification`] on its next call. A cursor's own
/// removal re-captures the fresh generation, so it invalidates every other
/// live cursor but stays valid itself.
#[derive(Debug)]
pub struct MemoryGraph {
    triples: Arc<Mutex<HashSet<Triple>>>,
    generation: Arc<AtomicU64>,
    check_concurrency: AtomicBool,
    registry: ListenerRegistry,
    lock: GraphLock,
}

impl MemoryGraph {
    /// Creates an empty graph using the process-wide shared scheduler for
    /// delayed listener delivery.
    #[must_use]
    pub fn new() -> Self {
        Self::with_scheduler(ThreadScheduler::shared())
    }

    /// Creates an empty graph delivering delayed batches on `scheduler`.
    #[must_use]
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            triples: Arc::new(Mutex::new(HashSet::new())),
            generation: Arc::new(AtomicU64::new(0)),
            check_concurrency: AtomicBool::new(false),
            registry: ListenerRegistry::new(GraphId::new(), scheduler),
            lock: GraphLock::new(),
        }
    }

    /// Creates a graph holding the given triples, deduplicated.
    ///
    /// No events are dispatched for the initial content.
    #[must_use]
    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        let graph = Self::new();
        if let Ok(mut set) = graph.triples.lock() {
            set.extend(triples);
        }
        graph
    }

    /// Enables or disables strict concurrency checking.
    ///
    /// When enabled, a cursor invalidated by a later structural mutation
    /// fails with [`GraphError::ConcurrentModification`] instead of silently
    /// iterating its stale snapshot. Disabled by default for performance.
    pub fn set_check_concurrency(&self, check: bool) {
        self.check_concurrency.store(check, Ordering::SeqCst);
    }

    fn guard(&self) -> GraphResult<MutexGuard<'_, HashSet<Triple>>> {
        self.triples
            .lock()
            .map_err(|_| GraphError::poisoned("memory.triples"))
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for MemoryGraph {
    fn size(&self) -> usize {
        // The backing set cannot be torn by a panic: mutations are single
        // insert/remove calls.
        self.triples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    fn lock(&self) -> &GraphLock {
        &self.lock
    }

    fn perform_filter<'a>(&'a self, pattern: &TriplePattern) -> GraphResult<Box<dyn Cursor + 'a>> {
        let guard = self.guard()?;
        let snapshot: Vec<Triple> = guard.iter().filter(|t| pattern.matches(t)).cloned().collect();
        // Capture the generation while still holding the lock, so no
        // mutation can slip between the copy and the capture.
        let captured = self.generation.load(Ordering::SeqCst);
        drop(guard);

        Ok(Box::new(MemoryCursor {
            snapshot: snapshot.into_iter(),
            current: None,
            triples: Arc::clone(&self.triples),
            generation: Arc::clone(&self.generation),
            captured,
            strict: self.check_concurrency.load(Ordering::SeqCst),
        }))
    }

    fn perform_add(&self, triple: &Triple) -> GraphResult<bool> {
        let mut guard = self.guard()?;
        let added = guard.insert(triple.clone());
        if added {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        Ok(added)
    }

    fn perform_remove(&self, triple: &Triple) -> GraphResult<bool> {
        let mut guard = self.guard()?;
        let removed = guard.remove(triple);
        if removed {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }
}

struct MemoryCursor {
    snapshot: std::vec::IntoIter<Triple>,
    current: Option<Triple>,
    triples: Arc<Mutex<HashSet<Triple>>>,
    generation: Arc<AtomicU64>,
    captured: u64,
    strict: bool,
}

impl MemoryCursor {
    fn check_validity(&self) -> GraphResult<()> {
        if self.strict && self.captured != self.generation.load(Ordering::SeqCst) {
            return Err(GraphError::ConcurrentModification);
        }
        Ok(())
    }
}

impl Cursor for MemoryCursor {
    fn advance(&mut self) -> GraphResult<Option<Triple>> {
        self.check_validity()?;
        self.current = self.snapshot.next();
        Ok(self.current.clone())
    }

    fn remove_current(&mut self) -> GraphResult<bool> {
        self.check_validity()?;
        let Some(current) = &self.current else {
            return Ok(false);
        };
        let mut guard = self
            .triples
            .lock()
            .map_err(|_| GraphError::poisoned("memory.triples"))?;
        let removed = guard.remove(current);
        if removed {
            // Bump under the lock and re-capture: every other live cursor
            // goes stale, this one stays valid.
            self.captured = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::event::{EventKind, GraphEvent, GraphListener};
    use crate::term::{BlankNode, Iri, Literal};

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    fn triple(n: u32) -> Triple {
        Triple::new(
            iri(&format!("http://e.com/s{n}")),
            iri("http://e.com/p"),
            Literal::plain(n.to_string()),
        )
    }

    #[test]
    fn test_add_contains_size() {
        let graph = MemoryGraph::new();
        assert!(graph.is_empty());

        assert!(graph.add(triple(1)).unwrap());
        assert!(graph.contains(&triple(1)).unwrap());
        assert_eq!(graph.size(), 1);

        assert!(!graph.add(triple(1)).unwrap());
        assert_eq!(graph.size(), 1);
    }

    #[test]
    fn test_remove_twice() {
        let graph = MemoryGraph::new();
        graph.add(triple(1)).unwrap();

        assert!(graph.remove(&triple(1)).unwrap());
        assert_eq!(graph.size(), 0);
        assert!(!graph.remove(&triple(1)).unwrap());
    }

    #[test]
    fn test_from_triples_deduplicates() {
        let graph = MemoryGraph::from_triples(vec![triple(1), triple(2), triple(1)]);
        assert_eq!(graph.size(), 2);
    }

    #[test]
    fn test_filter_by_position() {
        let graph = MemoryGraph::new();
        let node = BlankNode::new();
        graph.add(triple(1)).unwrap();
        graph
            .add(Triple::new(node, iri("http://e.com/q"), Literal::plain("x")))
            .unwrap();

        let by_subject = graph
            .filter(&TriplePattern::any().with_subject(node))
            .unwrap()
            .into_vec()
            .unwrap();
        assert_eq!(by_subject.len(), 1);
        assert_eq!(by_subject[0].predicate, iri("http://e.com/q"));

        let by_predicate = graph
            .filter(&TriplePattern::any().with_predicate(iri("http://e.com/p")))
            .unwrap()
            .into_vec()
            .unwrap();
        assert_eq!(by_predicate.len(), 1);

        let by_object = graph
            .filter(&TriplePattern::any().with_object(Literal::plain("1")))
            .unwrap()
            .into_vec()
            .unwrap();
        assert_eq!(by_object.len(), 1);
    }

    #[test]
    fn test_wildcard_filter_matches_full_iteration() {
        let graph = MemoryGraph::new();
        for n in 0..10 {
            graph.add(triple(n)).unwrap();
        }

        let mut filtered = graph.iter().unwrap().into_vec().unwrap();
        assert_eq!(filtered.len(), 10);
        filtered.sort_by_key(std::string::ToString::to_string);
        let mut expected: Vec<Triple> = (0..10).map(triple).collect();
        expected.sort_by_key(std::string::ToString::to_string);
        assert_eq!(filtered, expected);
    }

    #[test]
    fn test_snapshot_is_not_live() {
        let graph = MemoryGraph::new();
        graph.add(triple(1)).unwrap();

        let mut cursor = graph.iter().unwrap();
        graph.add(triple(2)).unwrap();

        // Snapshot taken before the mutation: exactly one triple.
        assert_eq!(cursor.advance().unwrap(), Some(triple(1)));
        assert_eq!(cursor.advance().unwrap(), None);
    }

    #[test]
    fn test_strict_mode_invalidates_on_add() {
        let graph = MemoryGraph::new();
        graph.set_check_concurrency(true);
        graph.add(triple(1)).unwrap();

        let mut cursor = graph.iter().unwrap();
        graph.add(triple(2)).unwrap();

        let err = cursor.advance().unwrap_err();
        assert!(matches!(err, GraphError::ConcurrentModification));

        // Recoverable: a fresh filter sees the new state.
        assert_eq!(graph.iter().unwrap().into_vec().unwrap().len(), 2);
    }

    #[test]
    fn test_strict_mode_invalidates_on_remove() {
        let graph = MemoryGraph::new();
        graph.set_check_concurrency(true);
        graph.add(triple(1)).unwrap();
        graph.add(triple(2)).unwrap();

        let mut cursor = graph.iter().unwrap();
        graph.remove(&triple(1)).unwrap();

        assert!(matches!(
            cursor.advance().unwrap_err(),
            GraphError::ConcurrentModification
        ));
    }

    #[test]
    fn test_lenient_mode_iterates_stale_snapshot() {
        let graph = MemoryGraph::new();
        graph.add(triple(1)).unwrap();

        let mut cursor = graph.iter().unwrap();
        graph.add(triple(2)).unwrap();

        // Default mode: no error, the stale snapshot is served.
        assert!(cursor.advance().unwrap().is_some());
        assert!(cursor.advance().unwrap().is_none());
    }

    #[test]
    fn test_own_removal_exempts_cursor_invalidates_others() {
        let graph = MemoryGraph::new();
        graph.set_check_concurrency(true);
        graph.add(triple(1)).unwrap();
        graph.add(triple(2)).unwrap();

        let mut remover = graph.iter().unwrap();
        let mut observer = graph.iter().unwrap();

        remover.advance().unwrap().unwrap();
        assert!(remover.remove_current().unwrap());

        // The removing cursor keeps iterating its snapshot.
        assert!(remover.advance().unwrap().is_some());
        assert!(remover.advance().unwrap().is_none());

        // Every other cursor is invalidated.
        assert!(matches!(
            observer.advance().unwrap_err(),
            GraphError::ConcurrentModification
        ));

        assert_eq!(graph.size(), 1);
    }

    #[test]
    fn test_cursor_removal_updates_backing_set_and_notifies() {
        struct Recorder {
            events: Mutex<Vec<GraphEvent>>,
        }
        impl GraphListener for Recorder {
            fn graph_changed(&self, events: &[GraphEvent]) {
                self.events.lock().unwrap().extend(events.iter().cloned());
            }
        }

        let graph = MemoryGraph::new();
        graph.add(triple(1)).unwrap();

        let listener = Arc::new(Recorder {
            events: Mutex::new(Vec::new()),
        });
        graph
            .registry()
            .add_listener(&listener, TriplePattern::any(), Duration::ZERO);

        let mut cursor = graph.iter().unwrap();
        cursor.advance().unwrap().unwrap();
        assert!(cursor.remove_current().unwrap());
        // Removing again is a no-op.
        assert!(!cursor.remove_current().unwrap());

        assert!(!graph.contains(&triple(1)).unwrap());
        let events = listener.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Removed);
        assert_eq!(events[0].triple, triple(1));
    }

    #[test]
    fn test_remove_all_and_clear() {
        let graph = MemoryGraph::new();
        for n in 0..4 {
            graph.add(triple(n)).unwrap();
        }

        assert!(graph.remove_all(&[triple(0), triple(1)]).unwrap());
        assert_eq!(graph.size(), 2);
        assert!(!graph.remove_all(&[triple(0)]).unwrap());

        graph.clear().unwrap();
        assert!(graph.is_empty());
    }
}
