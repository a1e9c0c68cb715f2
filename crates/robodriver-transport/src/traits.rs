//! Transport trait
//!
//! Defines the interface the command engine drives. Implementations own a
//! single connection to a fixed endpoint.

use crate::events::{EventHandler, SubscriptionId};
use async_trait::async_trait;
use robodriver_protocol::encode_ascii;

/// Generic transport trait for a single robot connection
///
/// Failures are reported as `false` plus a `Disconnected` event, never as
/// errors. After [`dispose`](Transport::dispose) every method is a no-op.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection, tearing down any previous one.
    ///
    /// With `blocking` the call resolves to the real outcome of the attempt.
    /// Without it the call returns `true` once the attempt has started, and
    /// the result arrives as a connection-state event.
    async fn connect(&self, blocking: bool) -> bool;

    /// Write raw bytes; `false` if not connected or the write failed
    async fn send(&self, bytes: &[u8]) -> bool;

    /// Write text using the ASCII wire encoding
    async fn send_text(&self, text: &str) -> bool {
        self.send(&encode_ascii(text)).await
    }

    /// Whether the socket is currently established
    fn is_connected(&self) -> bool;

    /// Close the connection.
    ///
    /// A graceful close (`force == false`) shuts the write side down
    /// quietly. A forced close publishes `Disconnected`. No-op when already
    /// disconnected.
    async fn disconnect(&self, force: bool);

    /// Release the connection for good. Idempotent.
    fn dispose(&self);

    /// Register an event handler
    fn subscribe(&self, handler: EventHandler) -> SubscriptionId;

    /// Remove an event handler; `false` if it was not registered
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
