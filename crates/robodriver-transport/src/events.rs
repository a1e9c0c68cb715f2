//! Transport notifications and the listener registry

use parking_lot::Mutex;
use robodriver_protocol::RobotConnectionState;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Notification published by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket was established or went away
    ConnectionChanged(RobotConnectionState),
    /// One completed read, decoded as text
    DataReceived(String),
}

/// Callback invoked for every published event
///
/// Handlers run on whichever task publishes: the caller of a transport
/// method, or the receive task. They must not block.
pub type EventHandler = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

/// Handle returned by [`EventHub::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registry of event handlers
///
/// The listener list is only touched under the event lock. Publishing
/// snapshots the list under the lock and calls the handlers after releasing
/// it, so a handler may subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, EventHandler)>>,
}

impl EventHub {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler
    pub fn subscribe(&self, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, handler));
        id
    }

    /// Remove a handler; `false` if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Remove every handler
    pub fn clear(&self) {
        self.handlers.lock().clear();
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }

    /// Deliver `event` to every handler registered at the time of the call
    pub fn publish(&self, event: &TransportEvent) {
        let snapshot: Vec<EventHandler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in snapshot {
            handler(event);
        }
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("handlers", &self.len())
            .finish()
    }
}
