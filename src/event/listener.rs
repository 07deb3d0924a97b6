//! Listener contract and change events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::GraphId;
use crate::triple::Triple;

/// The kind of structural change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A triple was added to the collection.
    Added,
    /// A triple was removed from the collection.
    Removed,
}

/// A change to a watched triple collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvent {
    /// What happened.
    pub kind: EventKind,
    /// The triple that was added or removed.
    pub triple: Triple,
    /// Identifier of the originating collection.
    pub graph: GraphId,
    /// When the mutation was applied.
    pub occurred_at: DateTime<Utc>,
}

impl GraphEvent {
    /// Creates an Added event.
    #[must_use]
    pub fn added(graph: GraphId, triple: Triple) -> Self {
        Self {
            kind: EventKind::Added,
            triple,
            graph,
            occurred_at: Utc::now(),
        }
    }

    /// Creates a Removed event.
    #[must_use]
    pub fn removed(graph: GraphId, triple: Triple) -> Self {
        Self {
            kind: EventKind::Removed,
            triple,
            graph,
            occurred_at: Utc::now(),
        }
    }
}

/// A subscriber notified of changes to a watched collection.
///
/// Implementations must tolerate being called from the mutating thread
/// (zero-delay registrations) as well as from the scheduler worker
/// (delayed registrations). A panicking listener is isolated: the panic is
/// caught, counted, and never prevents delivery to other listeners.
pub trait GraphListener: Send + Sync {
    /// Called with one event (synchronous delivery) or a whole accumulated
    /// batch (delayed delivery), in the order the mutations were applied.
    fn graph_changed(&self, events: &[GraphEvent]);
}

/// Handle identifying a listener registration.
///
/// Returned by `add_listener`; pass it to `remove_listener` to unregister.
/// Registrations hold the listener weakly, so a dropped listener is also
/// pruned opportunistically during dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Creates a new random listener ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
