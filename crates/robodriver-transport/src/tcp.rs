//! TCP transport implementation
//!
//! Owns one socket to a fixed robot endpoint. The socket is split after
//! connecting: the write half stays with the transport, the read half moves
//! into a receive task that publishes every completed read as one
//! [`TransportEvent::DataReceived`] fragment.

use crate::error::{Result, TransportError};
use crate::events::{EventHandler, EventHub, SubscriptionId, TransportEvent};
use crate::traits::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use robodriver_core::DisposeGuard;
use robodriver_protocol::{RobotConnectionState, decode_ascii};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Size of the buffer each socket read fills
pub const RECEIVE_BUFFER_SIZE: usize = 1024;

/// TCP transport for a single robot connection
///
/// Not `Clone`: the transport is the unique owner of its socket. Share it
/// behind an `Arc` instead. Dropping the last handle disposes it.
pub struct TcpTransport {
    shared: Arc<Shared>,
}

/// An established socket
struct Connection {
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    reader: JoinHandle<()>,
    generation: u64,
}

/// State shared between the transport handle and its background tasks
struct Shared {
    endpoint: SocketAddr,
    connection: Mutex<Option<Connection>>,
    connected: AtomicBool,
    // Bumped by every connect and by dispose; a pending attempt whose
    // generation is stale discards its socket instead of installing it.
    generation: AtomicU64,
    events: EventHub,
    guard: DisposeGuard,
}

impl TcpTransport {
    /// Create a transport for `address:port` without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidAddress`] if `address` is not an IPv4
    /// or IPv6 literal.
    pub fn new(address: &str, port: u16) -> Result<Self> {
        let ip: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| TransportError::InvalidAddress(address.to_string()))?;

        Ok(Self::with_endpoint(SocketAddr::new(ip, port)))
    }

    /// Create a transport for an already resolved endpoint
    pub fn with_endpoint(endpoint: SocketAddr) -> Self {
        Self {
            shared: Arc::new(Shared {
                endpoint,
                connection: Mutex::new(None),
                connected: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                events: EventHub::new(),
                guard: DisposeGuard::new(),
            }),
        }
    }

    /// Remote endpoint this transport connects to
    pub fn endpoint(&self) -> SocketAddr {
        self.shared.endpoint
    }

    /// Whether [`dispose`](Transport::dispose) has run
    pub fn is_disposed(&self) -> bool {
        self.shared.guard.is_disposed()
    }
}

impl Shared {
    fn publish_state(&self, state: RobotConnectionState) {
        self.events
            .publish(&TransportEvent::ConnectionChanged(state));
    }

    /// Detach the current connection and clear the connected flag
    fn take_connection(&self) -> Option<Connection> {
        let connection = self.connection.lock().take();
        self.connected.store(false, Ordering::SeqCst);
        connection
    }

    fn current_writer(&self) -> Option<Arc<tokio::sync::Mutex<OwnedWriteHalf>>> {
        if !self.connected.load(Ordering::SeqCst) {
            return None;
        }
        self.connection
            .lock()
            .as_ref()
            .map(|connection| Arc::clone(&connection.writer))
    }

    /// Run one connection attempt to completion and report its outcome
    async fn establish(self: Arc<Self>, generation: u64) -> bool {
        match Arc::clone(&self).open(generation).await {
            Ok(start_reading) => {
                info!(endpoint = %self.endpoint, "connected to robot");
                self.publish_state(RobotConnectionState::Connected);
                // The receive task waits for this so that a peer closing
                // straight away cannot report Disconnected before Connected.
                let _ = start_reading.send(());
                true
            }
            Err(TransportError::Other(reason)) => {
                debug!(endpoint = %self.endpoint, %reason, "connection attempt discarded");
                false
            }
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = %err, "failed to connect to robot");
                self.publish_state(RobotConnectionState::Disconnected);
                false
            }
        }
    }

    /// Connect the socket and install it as the current connection.
    ///
    /// Returns the trigger that starts the receive task.
    async fn open(self: Arc<Self>, generation: u64) -> Result<oneshot::Sender<()>> {
        let stream = TcpStream::connect(self.endpoint)
            .await
            .map_err(|e| TransportError::Connection(format!("{}: {}", self.endpoint, e)))?;
        if let Err(err) = stream.set_nodelay(true) {
            debug!(error = %err, "could not disable Nagle's algorithm");
        }
        let (read_half, write_half) = stream.into_split();

        let installed = self.guard.while_live(|| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return None;
            }
            let (start_tx, start_rx) = oneshot::channel();
            // Hold the slot while spawning so the receive task can never
            // observe the connection half-installed.
            let mut slot = self.connection.lock();
            let reader = tokio::spawn(Arc::clone(&self).receive_loop(
                read_half,
                generation,
                start_rx,
            ));
            *slot = Some(Connection {
                writer: Arc::new(tokio::sync::Mutex::new(write_half)),
                reader,
                generation,
            });
            self.connected.store(true, Ordering::SeqCst);
            drop(slot);
            Some(start_tx)
        });

        match installed {
            Some(Some(start_tx)) => Ok(start_tx),
            Some(None) => Err(TransportError::Other(
                "superseded by a newer connection attempt".to_string(),
            )),
            None => Err(TransportError::Disposed),
        }
    }

    /// Read until end-of-stream or error, publishing each chunk
    async fn receive_loop(
        self: Arc<Self>,
        mut reader: OwnedReadHalf,
        generation: u64,
        start: oneshot::Receiver<()>,
    ) {
        if start.await.is_err() {
            return;
        }

        let mut buffer = [0u8; RECEIVE_BUFFER_SIZE];
        loop {
            match reader.read(&mut buffer).await {
                Ok(0) => {
                    debug!(endpoint = %self.endpoint, "robot closed the connection");
                    break;
                }
                Ok(n) => {
                    let fragment = decode_ascii(&buffer[..n]);
                    trace!(bytes = n, "received fragment");
                    self.events.publish(&TransportEvent::DataReceived(fragment));
                }
                Err(err) => {
                    warn!(endpoint = %self.endpoint, error = %TransportError::from(err), "receive failed");
                    break;
                }
            }
        }

        self.on_stream_closed(generation);
    }

    /// Tear down after the receive task stopped on its own
    fn on_stream_closed(&self, generation: u64) {
        let released = {
            let mut slot = self.connection.lock();
            match slot.as_ref() {
                Some(connection) if connection.generation == generation => slot.take(),
                _ => None,
            }
        };

        if released.is_some() && self.connected.swap(false, Ordering::SeqCst) {
            self.publish_state(RobotConnectionState::Disconnected);
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, blocking: bool) -> bool {
        if self.shared.guard.is_disposed() {
            return false;
        }

        self.disconnect(true).await;

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(endpoint = %self.shared.endpoint, blocking, "connecting");

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let connected = shared.establish(generation).await;
            let _ = outcome_tx.send(connected);
        });

        if blocking {
            outcome_rx.await.unwrap_or(false)
        } else {
            true
        }
    }

    async fn send(&self, bytes: &[u8]) -> bool {
        let Some(writer) = self.shared.current_writer() else {
            debug!("send skipped, not connected");
            return false;
        };

        let result = {
            let mut writer = writer.lock().await;
            writer.write_all(bytes).await
        };

        match result {
            Ok(()) => {
                trace!(bytes = bytes.len(), "sent");
                true
            }
            Err(err) => {
                error!(endpoint = %self.shared.endpoint, error = %TransportError::from(err), "send failed, disposing transport");
                self.dispose();
                false
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self, force: bool) {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return;
        }
        let Some(connection) = self.shared.take_connection() else {
            return;
        };
        connection.reader.abort();

        if force {
            debug!(endpoint = %self.shared.endpoint, "connection closed (forced)");
            self.shared.publish_state(RobotConnectionState::Disconnected);
        } else {
            let mut writer = connection.writer.lock().await;
            if let Err(err) = writer.shutdown().await {
                debug!(error = %err, "shutdown of write half failed");
            }
            debug!(endpoint = %self.shared.endpoint, "connection closed");
        }
    }

    fn dispose(&self) {
        let mut released = None;
        let disposed = self.shared.guard.dispose_with(|| {
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            released = self.shared.take_connection();
        });
        if !disposed {
            return;
        }

        if let Some(connection) = released {
            connection.reader.abort();
            self.shared.publish_state(RobotConnectionState::Disconnected);
        }
        info!(endpoint = %self.shared.endpoint, "transport disposed");
    }

    fn subscribe(&self, handler: EventHandler) -> SubscriptionId {
        self.shared.events.subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.events.unsubscribe(id)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("endpoint", &self.shared.endpoint)
            .field("connected", &self.is_connected())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
