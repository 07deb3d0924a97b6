//! Scheduler abstraction for delayed listener delivery.
//!
//! Delayed batches are armed on a [`Scheduler`] rather than a hard-wired
//! timer thread, so the delivery mechanism is testable without wall-clock
//! waits: production code uses the shared [`ThreadScheduler`], tests inject
//! a [`ManualScheduler`] and fire tasks on demand.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

/// A one-shot task queued for execution after a delay.
pub type Task = Box<dyn FnOnce() + Send>;

/// Executes tasks after a delay.
pub trait Scheduler: Send + Sync {
    /// Queues `task` to run once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Task);
}

struct ScheduledTask {
    due: Instant,
    seq: u64,
    task: Task,
}

// Min-heap ordering: the earliest deadline (then lowest sequence number)
// is the greatest element after `Reverse` wrapping below.
impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// A shared single-thread scheduler.
///
/// One named worker thread owns a deadline heap; `schedule` enqueues over a
/// bounded channel. All graphs in a process can share one instance via
/// [`ThreadScheduler::shared`].
pub struct ThreadScheduler {
    tx: Sender<ScheduledTask>,
    seq: AtomicU64,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ThreadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadScheduler").finish_non_exhaustive()
    }
}

impl ThreadScheduler {
    const QUEUE_CAPACITY: usize = 4096;

    /// Spawns a scheduler with its own worker thread.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = bounded::<ScheduledTask>(Self::QUEUE_CAPACITY);

        let join = thread::Builder::new()
            .name("tristore-scheduler".to_string())
            .spawn(move || {
                let mut heap: BinaryHeap<std::cmp::Reverse<ScheduledTask>> = BinaryHeap::new();
                let mut disconnected = false;

                loop {
                    let now = Instant::now();
                    while heap.peek().is_some_and(|t| t.0.due <= now) {
                        let std::cmp::Reverse(entry) = heap.pop().expect("peeked entry");
                        (entry.task)();
                    }

                    if disconnected {
                        // Armed deliveries still fire after the last sender
                        // is gone; exit once the heap drains.
                        match heap.peek() {
                            Some(next) => {
                                thread::sleep(next.0.due.saturating_duration_since(Instant::now()));
                            }
                            None => break,
                        }
                        continue;
                    }

                    let received = match heap.peek() {
                        Some(next) => {
                            let wait = next.0.due.saturating_duration_since(Instant::now());
                            rx.recv_timeout(wait)
                        }
                        None => rx
                            .recv()
                            .map_err(|_| RecvTimeoutError::Disconnected),
                    };

                    match received {
                        Ok(entry) => heap.push(std::cmp::Reverse(entry)),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => disconnected = true,
                    }
                }
            })
            .expect("failed to spawn tristore scheduler worker");

        Self {
            tx,
            seq: AtomicU64::new(0),
            join: Mutex::new(Some(join)),
        }
    }

    /// Returns the process-wide shared scheduler, creating it on first use.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<ThreadScheduler>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let entry = ScheduledTask {
            due: Instant::now() + delay,
            seq: self.seq.fetch_add(1, AtomicOrdering::Relaxed),
            task,
        };
        if self.tx.send(entry).is_err() {
            tracing::debug!("scheduler worker gone, dropping task");
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.join.lock() {
            if let Some(handle) = guard.take() {
                // Detach rather than join: the worker exits on its own once
                // the sender is dropped and any armed tasks have fired.
                drop(handle);
            }
        }
    }
}

/// A deterministic scheduler for tests.
///
/// Tasks accumulate with their requested delay and fire only when
/// [`ManualScheduler::run_due`] or [`ManualScheduler::run_all`] is called.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: Mutex<Vec<(Duration, Task)>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl ManualScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Fires every task whose delay is at most `elapsed`, in schedule order.
    pub fn run_due(&self, elapsed: Duration) {
        let due: Vec<Task> = {
            let Ok(mut tasks) = self.tasks.lock() else {
                return;
            };
            let mut due = Vec::new();
            let mut remaining = Vec::with_capacity(tasks.len());
            for (delay, task) in tasks.drain(..) {
                if delay <= elapsed {
                    due.push(task);
                } else {
                    remaining.push((delay, task));
                }
            }
            *tasks = remaining;
            due
        };
        // Run outside the lock: a firing task may schedule a new one.
        for task in due {
            task();
        }
    }

    /// Fires every pending task in schedule order.
    pub fn run_all(&self) {
        self.run_due(Duration::MAX);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push((delay, task));
        }
    }
}
