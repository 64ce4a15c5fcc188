use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle marker carried by every event.
///
/// The bus never consults this for control flow; it exists for callers that
/// want to tag where an event instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventState {
    #[default]
    Created,
    Dispatched,
}

/// Bookkeeping shared by every event type: identity, creation time, the
/// cancellation flag, and the lifecycle marker.
///
/// The cancellation flag is a single atomic per event instance. Handlers all
/// observe the same flag by reference, so a cancel by one handler is visible
/// to every handler invoked after it within the same `fire` call.
#[derive(Debug)]
pub struct EventMeta {
    id: Uuid,
    created_at: DateTime<Utc>,
    canceled: AtomicBool,
    state: RwLock<EventState>,
}

impl EventMeta {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            canceled: AtomicBool::new(false),
            state: RwLock::new(EventState::Created),
        }
    }

    /// Unique identifier for this event instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Timestamp when the event was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    pub fn set_canceled(&self, canceled: bool) {
        self.canceled.store(canceled, Ordering::SeqCst);
    }

    pub fn state(&self) -> EventState {
        *self.state.read()
    }

    pub fn set_state(&self, state: EventState) {
        *self.state.write() = state;
    }
}

impl Default for EventMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// A payload that can be fired on the bus.
///
/// Implementors embed an [`EventMeta`] and hand it back from [`Event::meta`];
/// [`Event::as_any`] enables the exact-type dispatch match (an event is
/// delivered only to links declared for its concrete type, never to links
/// for some broader type).
///
/// Events travel as `Arc<dyn Event>`, so one instance is shared by reference
/// across every handler of a `fire` call: a mutation made through interior
/// mutability by a higher-priority handler is visible to handlers invoked
/// after it. Asynchronous handlers may still hold the event after `fire`
/// returns and after the caller drops its own reference.
pub trait Event: Any + Send + Sync {
    fn meta(&self) -> &EventMeta;

    fn as_any(&self) -> &dyn Any;

    /// Whether the event has been flagged as canceled. Informational only:
    /// dispatch never short-circuits on it.
    fn is_canceled(&self) -> bool {
        self.meta().is_canceled()
    }

    fn set_canceled(&self, canceled: bool) {
        self.meta().set_canceled(canceled);
    }

    fn state(&self) -> EventState {
        self.meta().state()
    }

    fn set_state(&self, state: EventState) {
        self.meta().set_state(state);
    }
}
