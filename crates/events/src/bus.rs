//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` in the application state.
//! Handlers publish a [`MinistryEvent`] after their primary write and
//! return immediately; delivery happens in the dispatcher task.

use chrono::{DateTime, Utc};
use rkids_core::notification::NotificationMessage;
use rkids_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// MinistryEvent
// ---------------------------------------------------------------------------

/// Something that happened to a child or account and should reach a family
/// or a user.
///
/// Constructed via [`MinistryEvent::new`] and addressed with
/// [`for_child`](MinistryEvent::for_child),
/// [`for_guardian`](MinistryEvent::for_guardian) and
/// [`for_user`](MinistryEvent::for_user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinistryEvent {
    /// Dot-separated event name, e.g. `"child.checked_in"`.
    pub event_type: String,

    pub church_id: DbId,

    pub child_id: Option<DbId>,

    /// Guardian who should receive the notification.
    pub guardian_id: Option<DbId>,

    /// User who should receive the notification when no guardian is set.
    pub user_id: Option<DbId>,

    /// Composed notification content.
    pub message: NotificationMessage,

    /// Free-form JSON payload for structured logging.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl MinistryEvent {
    pub fn new(
        event_type: impl Into<String>,
        church_id: DbId,
        message: NotificationMessage,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            church_id,
            child_id: None,
            guardian_id: None,
            user_id: None,
            message,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn for_child(mut self, child_id: DbId) -> Self {
        self.child_id = Some(child_id);
        self
    }

    /// Address the event to a guardian. `None` leaves it unaddressed.
    pub fn for_guardian(mut self, guardian_id: Option<DbId>) -> Self {
        self.guardian_id = guardian_id;
        self
    }

    pub fn for_user(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<MinistryEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is subscribed.
    pub fn publish(&self, event: MinistryEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MinistryEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
