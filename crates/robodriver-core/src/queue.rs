//! Inbound fragment queue.
//!
//! The receive side of a connection produces one text fragment per completed
//! socket read. The command engine consumes them by draining everything that
//! is currently buffered into a single reply string.

use parking_lot::RwLock;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Ordered, thread-safe buffer of text fragments.
///
/// Producers call [`push`](Self::push); the single consumer calls
/// [`drain`](Self::drain), which removes and concatenates every buffered
/// fragment under one write lock. A fragment pushed while a drain is in
/// progress is therefore never split or lost: it simply shows up in the next
/// drain.
///
/// Neither operation performs I/O while holding the lock.
///
/// # Waiting for data
///
/// Each push also signals an arrival notification. The consumer can call
/// [`wait_until`](Self::wait_until) to sleep until data is buffered or a
/// deadline passes, instead of sleeping for a fixed window.
///
/// # Examples
///
/// ```rust
/// use robodriver_core::FragmentQueue;
///
/// let queue = FragmentQueue::new();
/// queue.push("In ");
/// queue.push("Progress");
///
/// assert_eq!(queue.len(), 2);
/// assert_eq!(queue.drain(), "In Progress");
/// assert!(queue.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct FragmentQueue {
    fragments: RwLock<VecDeque<String>>,
    arrival: Notify,
}

impl FragmentQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and wake a waiting consumer.
    pub fn push(&self, fragment: impl Into<String>) {
        self.fragments.write().push_back(fragment.into());
        // notify_one stores a permit when nobody is waiting yet, so an arrival
        // between the consumer's emptiness check and its await is not missed.
        self.arrival.notify_one();
    }

    /// Remove every buffered fragment and return them concatenated in
    /// arrival order.
    ///
    /// Returns an empty string when nothing is buffered.
    pub fn drain(&self) -> String {
        let mut fragments = self.fragments.write();
        if fragments.is_empty() {
            return String::new();
        }

        let total = fragments.iter().map(String::len).sum();
        let mut reply = String::with_capacity(total);
        for fragment in fragments.drain(..) {
            reply.push_str(&fragment);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(bytes = reply.len(), "drained inbound fragments");

        reply
    }

    /// Discard everything that is buffered.
    pub fn clear(&self) {
        self.fragments.write().clear();
    }

    /// Number of buffered fragments.
    pub fn len(&self) -> usize {
        self.fragments.read().len()
    }

    /// Whether no fragment is buffered.
    pub fn is_empty(&self) -> bool {
        self.fragments.read().is_empty()
    }

    /// Wait until at least one fragment is buffered or `deadline` passes.
    ///
    /// Returns `true` if data is buffered when the call returns. Dropping the
    /// returned future cancels the wait without side effects.
    pub async fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            if !self.is_empty() {
                return true;
            }
            if tokio::time::timeout_at(deadline, self.arrival.notified())
                .await
                .is_err()
            {
                return !self.is_empty();
            }
            // A stale permit from an already-drained push wakes us spuriously;
            // the emptiness check above sorts that out.
        }
    }
}
