//! Delayed, batched event delivery.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use super::listener::{GraphListener, ListenerId};
use super::scheduler::Scheduler;
use super::GraphEvent;

struct PendingBatch {
    listener: Weak<dyn GraphListener>,
    events: Vec<GraphEvent>,
}

/// Accumulates events per delayed listener and delivers them in batches.
///
/// The first event of a batch arms a one-shot task on the shared scheduler;
/// when it fires, the whole accumulated batch is delivered as one
/// `graph_changed` call and cleared. Events arriving after the batch fired
/// start a new batch with its own task. Removing a listener from the
/// registry stops new batches from accumulating but does not retract an
/// already-armed delivery.
pub struct DelayedNotificator {
    scheduler: Arc<dyn Scheduler>,
    batches: Arc<Mutex<HashMap<ListenerId, PendingBatch>>>,
    failed_deliveries: Arc<AtomicU64>,
}

impl std::fmt::Debug for DelayedNotificator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedNotificator")
            .field("failed_deliveries", &self.failed_deliveries())
            .finish_non_exhaustive()
    }
}

impl DelayedNotificator {
    /// Creates a notificator arming its batches on `scheduler`.
    #[must_use]
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            batches: Arc::new(Mutex::new(HashMap::new())),
            failed_deliveries: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Appends `event` to the listener's pending batch, arming the delivery
    /// task if this is the first event of the batch.
    pub fn enqueue(
        &self,
        id: ListenerId,
        listener: Weak<dyn GraphListener>,
        delay: Duration,
        event: GraphEvent,
    ) {
        let arm = {
            let Ok(mut batches) = self.batches.lock() else {
                return;
            };
            match batches.get_mut(&id) {
                Some(batch) => {
                    batch.events.push(event);
                    false
                }
                None => {
                    batches.insert(
                        id,
                        PendingBatch {
                            listener,
                            events: vec![event],
                        },
                    );
                    true
                }
            }
        };

        if arm {
            let batches = Arc::clone(&self.batches);
            let failed = Arc::clone(&self.failed_deliveries);
            self.scheduler.schedule(
                delay,
                Box::new(move || {
                    let batch = batches.lock().ok().and_then(|mut map| map.remove(&id));
                    let Some(batch) = batch else {
                        return;
                    };
                    let Some(listener) = batch.listener.upgrade() else {
                        return;
                    };
                    let delivery =
                        catch_unwind(AssertUnwindSafe(|| listener.graph_changed(&batch.events)));
                    if delivery.is_err() {
                        failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(listener = %id, "delayed listener panicked during delivery");
                    }
                }),
            );
        }
    }

    /// Number of batched deliveries that panicked in the listener.
    #[must_use]
    pub fn failed_deliveries(&self) -> u64 {
        self.failed_deliveries.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn pending_batches(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::scheduler::ManualScheduler;
    use crate::graph::GraphId;
    use crate::term::{Iri, Literal};
    use crate::triple::Triple;

    struct Recorder {
        calls: Mutex<Vec<Vec<GraphEvent>>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl GraphListener for Recorder {
        fn graph_changed(&self, events: &[GraphEvent]) {
            self.calls.lock().unwrap().push(events.to_vec());
        }
    }

    fn event(n: u32) -> GraphEvent {
        GraphEvent::added(
            GraphId::new(),
            Triple::new(
                Iri::new(format!("http://e.com/s{n}")).unwrap(),
                Iri::new("http://e.com/p").unwrap(),
                Literal::plain(n.to_string()),
            ),
        )
    }

    #[test]
    fn test_batch_accumulates_until_fired() {
        let scheduler = Arc::new(ManualScheduler::new());
        let notificator = DelayedNotificator::new(Arc::clone(&scheduler) as Arc<dyn Scheduler>);
        let listener = Recorder::new();
        let id = ListenerId::new();
        let weak = Arc::downgrade(&listener) as Weak<dyn GraphListener>;
        let delay = Duration::from_millis(100);

        notificator.enqueue(id, weak.clone(), delay, event(1));
        notificator.enqueue(id, weak.clone(), delay, event(2));
        notificator.enqueue(id, weak, delay, event(3));

        // One armed task for the whole batch.
        assert_eq!(scheduler.pending(), 1);
        assert!(listener.calls.lock().unwrap().is_empty());

        scheduler.run_all();

        let calls = listener.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let batch = &calls[0];
        assert_eq!(batch.len(), 3);
        // Arrival order preserved within the batch.
        assert_eq!(batch[0].triple.object, Literal::plain("1").into());
        assert_eq!(batch[2].triple.object, Literal::plain("3").into());
        assert_eq!(notificator.pending_batches(), 0);
    }

    #[test]
    fn test_events_after_firing_start_a_new_batch() {
        let scheduler = Arc::new(ManualScheduler::new());
        let notificator = DelayedNotificator::new(Arc::clone(&scheduler) as Arc<dyn Scheduler>);
        let listener = Recorder::new();
        let id = ListenerId::new();
        let delay = Duration::from_millis(10);

        let weak = Arc::downgrade(&listener) as Weak<dyn GraphListener>;
        notificator.enqueue(id, weak.clone(), delay, event(1));
        scheduler.run_all();

        notificator.enqueue(id, weak, delay, event(2));
        assert_eq!(scheduler.pending(), 1);
        scheduler.run_all();

        let calls = listener.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[1].len(), 1);
    }

    #[test]
    fn test_dropped_listener_batch_is_discarded() {
        let scheduler = Arc::new(ManualScheduler::new());
        let notificator = DelayedNotificator::new(Arc::clone(&scheduler) as Arc<dyn Scheduler>);
        let id = ListenerId::new();

        let listener = Recorder::new();
        let weak = Arc::downgrade(&listener) as Weak<dyn GraphListener>;
        notificator.enqueue(id, weak, Duration::from_millis(10), event(1));
        drop(listener);

        scheduler.run_all();
        assert_eq!(notificator.pending_batches(), 0);
        assert_eq!(notificator.failed_deliveries(), 0);
    }

    #[test]
    fn test_panicking_listener_is_counted() {
        struct Panicker;
        impl GraphListener for Panicker {
            fn graph_changed(&self, _events: &[GraphEvent]) {
                panic!("listener bug");
            }
        }

        let scheduler = Arc::new(ManualScheduler::new());
        let notificator = DelayedNotificator::new(Arc::clone(&scheduler) as Arc<dyn Scheduler>);
        let listener: Arc<dyn GraphListener> = Arc::new(Panicker);
        let id = ListenerId::new();

        notificator.enqueue(id, Arc::downgrade(&listener), Duration::ZERO, event(1));
        scheduler.run_all();

        assert_eq!(notificator.failed_deliveries(), 1);
    }
}
