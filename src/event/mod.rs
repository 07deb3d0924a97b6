//! Change-notification subsystem.
//!
//! Every successful add/remove on a watched collection produces a
//! [`GraphEvent`]. The [`ListenerRegistry`] matches it against each
//! registration's [`crate::pattern::TriplePattern`] and either delivers
//! synchronously (zero delay) or hands it to the [`DelayedNotificator`],
//! which batches events per listener on a shared [`Scheduler`].

/// Listener contract and change events.
pub mod listener;
/// Delayed, batched delivery.
pub mod notificator;
/// Listener registrations and dispatch.
pub mod registry;
/// Scheduler abstraction and implementations.
pub mod scheduler;

pub use listener::{EventKind, GraphEvent, GraphListener, ListenerId};
pub use notificator::DelayedNotificator;
pub use registry::ListenerRegistry;
pub use scheduler::{ManualScheduler, Scheduler, Task, ThreadScheduler};
