//! Listener registrations and event dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::graph::GraphId;
use crate::pattern::TriplePattern;

use super::listener::{GraphListener, ListenerId};
use super::notificator::DelayedNotificator;
use super::scheduler::Scheduler;
use super::GraphEvent;

struct ListenerEntry {
    id: ListenerId,
    listener: Weak<dyn GraphListener>,
    pattern: TriplePattern,
    delay: Duration,
}

/// The set of listener registrations of one watched collection.
///
/// Listeners are held by weak reference: a registration whose subscriber was
/// dropped is pruned lazily on the next dispatch. Zero-delay registrations
/// are notified synchronously on the mutating thread; positive delays route
/// through the [`DelayedNotificator`].
pub struct ListenerRegistry {
    graph: GraphId,
    entries: Mutex<Vec<ListenerEntry>>,
    notificator: DelayedNotificator,
    failed_deliveries: AtomicU64,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("graph", &self.graph)
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry for the collection identified by `graph`.
    #[must_use]
    pub fn new(graph: GraphId, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            graph,
            entries: Mutex::new(Vec::new()),
            notificator: DelayedNotificator::new(scheduler),
            failed_deliveries: AtomicU64::new(0),
        }
    }

    /// Identifier of the collection this registry belongs to.
    #[must_use]
    pub const fn graph_id(&self) -> GraphId {
        self.graph
    }

    /// Registers `listener` for events matching `pattern`.
    ///
    /// With `delay == 0` events are delivered synchronously on the mutating
    /// thread; otherwise they accumulate and arrive as one batched call per
    /// delay window. The registration holds the listener weakly; keep the
    /// `Arc` alive for as long as notifications are wanted.
    pub fn add_listener<L>(
        &self,
        listener: &Arc<L>,
        pattern: TriplePattern,
        delay: Duration,
    ) -> ListenerId
    where
        L: GraphListener + 'static,
    {
        let id = ListenerId::new();
        let entry = ListenerEntry {
            id,
            listener: Arc::downgrade(listener) as Weak<dyn GraphListener>,
            pattern,
            delay,
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
        id
    }

    /// Removes a registration.
    ///
    /// Returns true if the handle was registered. An already-armed batched
    /// delivery for this listener is not retracted; only future
    /// accumulation stops.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    /// Dispatches `event` to every live registration whose pattern matches.
    ///
    /// Registrations whose listener was dropped are pruned as a side effect.
    pub fn dispatch(&self, event: GraphEvent) {
        // Collect matching deliveries under the lock, run them outside it,
        // so a listener may re-enter the registry without deadlocking.
        let matching: Vec<(ListenerId, Weak<dyn GraphListener>, Duration)> = {
            let Ok(mut entries) = self.entries.lock() else {
                return;
            };
            entries.retain(|entry| entry.listener.strong_count() > 0);
            entries
                .iter()
                .filter(|entry| entry.pattern.matches(&event.triple))
                .map(|entry| (entry.id, entry.listener.clone(), entry.delay))
                .collect()
        };

        for (id, weak, delay) in matching {
            if delay.is_zero() {
                let Some(listener) = weak.upgrade() else {
                    continue;
                };
                let delivery = catch_unwind(AssertUnwindSafe(|| {
                    listener.graph_changed(std::slice::from_ref(&event));
                }));
                if delivery.is_err() {
                    self.failed_deliveries.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(listener = %id, "listener panicked during synchronous delivery");
                }
            } else {
                self.notificator.enqueue(id, weak, delay, event.clone());
            }
        }
    }

    /// Number of live registrations.
    ///
    /// Dead registrations linger until the next dispatch, so this may
    /// overcount briefly after a listener is dropped.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Number of synchronous deliveries that panicked in the listener.
    #[must_use]
    pub fn failed_deliveries(&self) -> u64 {
        self.failed_deliveries.load(Ordering::Relaxed)
    }
}
