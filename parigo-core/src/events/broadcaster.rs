//! Fan-out of stream events to transport sessions.
//!
//! Built on `tokio::sync::broadcast`: publishing never blocks the
//! reconciler, registration (subscribe) and deregistration (dropping the
//! receiver) are safe while publishes are in flight, and a session that
//! cannot keep up lags and loses events for itself only.

use tokio::sync::broadcast;

use super::types::StreamEvent;

/// Default broadcast capacity; enough headroom for bursts while keeping
/// per-session memory bounded.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Receiver half of one transport session.
pub type EventReceiver = broadcast::Receiver<StreamEvent>;

/// Handle for publishing stream events to every attached session.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<StreamEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new transport session.
    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    /// Deliver an event to every currently attached session.
    ///
    /// Returns how many sessions the event was queued for. Never fails
    /// and never blocks; with no sessions attached the event is simply
    /// discarded.
    pub fn publish(&self, event: StreamEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Number of currently attached sessions.
    pub fn session_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
