//! Testing utilities for integration tests
//!
//! Provides a mock transport for exercising the command engine and the
//! device driver without a robot on the network.

use crate::engine::Connector;
use async_trait::async_trait;
use parking_lot::Mutex;
use robodriver_protocol::{FINISHED_SUCCESSFULLY, RobotConnectionState, decode_ascii};
use robodriver_transport::{EventHandler, EventHub, SubscriptionId, Transport, TransportEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// What the mock robot does with one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Answer with one fragment
    Reply(String),
    /// Answer with several fragments, delivered in order
    Fragments(Vec<String>),
    /// Accept the command and never answer
    Silent,
    /// Fail the socket write
    FailSend,
}

/// Configuration for mock transport behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Optional delay before each reply fragment is delivered
    pub response_delay: Option<Duration>,

    /// Whether connection attempts fail
    pub refuse_connections: bool,
}

type Responder = Box<dyn FnMut(&str) -> MockResponse + Send>;

struct MockState {
    config: MockConfig,
    scripted: Mutex<VecDeque<MockResponse>>,
    responder: Mutex<Option<Responder>>,
    sent: Mutex<Vec<String>>,
    connected: AtomicBool,
    connect_count: AtomicUsize,
    dispose_count: AtomicUsize,
    events: EventHub,
}

/// Mock transport for testing that simulates a robot
///
/// Allows tests to:
/// - Script responses per command, or answer through a closure
/// - Track sent commands
/// - Simulate reply latency, refused connections and write failures
/// - Close the connection from the robot's side
///
/// Clones share state, so a test can keep one handle for inspection while
/// the engine owns another through [`connector`](Self::connector). Unlike a
/// real transport it can be connected again after `dispose`.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    /// Create a mock transport with default configuration
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a mock transport with custom configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            state: Arc::new(MockState {
                config,
                scripted: Mutex::new(VecDeque::new()),
                responder: Mutex::new(None),
                sent: Mutex::new(Vec::new()),
                connected: AtomicBool::new(false),
                connect_count: AtomicUsize::new(0),
                dispose_count: AtomicUsize::new(0),
                events: EventHub::new(),
            }),
        }
    }

    /// A robot that hands out increasing process ids and reports every
    /// process as finished
    pub fn idle_robot() -> Self {
        let mut next_id = 0;
        Self::new().with_responder(move |command| {
            if command.starts_with("status%") {
                MockResponse::Reply(FINISHED_SUCCESSFULLY.to_string())
            } else {
                next_id += 1;
                MockResponse::Reply(next_id.to_string())
            }
        })
    }

    /// Answer commands that have no scripted response through `responder`
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: FnMut(&str) -> MockResponse + Send + 'static,
    {
        *self.state.responder.lock() = Some(Box::new(responder));
        self
    }

    /// Queue a response for the next unanswered command
    pub fn enqueue_response(&self, response: MockResponse) {
        self.state.scripted.lock().push_back(response);
    }

    /// Connector handing out this mock for every connect
    pub fn connector(&self) -> Connector {
        let mock = self.clone();
        Arc::new(move |_address, _port| {
            let transport: Arc<dyn Transport> = Arc::new(mock.clone());
            Ok(transport)
        })
    }

    /// Commands sent so far, decoded
    pub fn sent_commands(&self) -> Vec<String> {
        self.state.sent.lock().clone()
    }

    /// Clear sent command tracking
    pub fn clear_sent_commands(&self) {
        self.state.sent.lock().clear();
    }

    /// Number of `connect` calls
    pub fn connect_count(&self) -> usize {
        self.state.connect_count.load(Ordering::SeqCst)
    }

    /// Number of `dispose` calls
    pub fn dispose_count(&self) -> usize {
        self.state.dispose_count.load(Ordering::SeqCst)
    }

    /// Number of registered event handlers
    pub fn subscriber_count(&self) -> usize {
        self.state.events.len()
    }

    /// Deliver a fragment nobody asked for
    pub fn push_unsolicited(&self, fragment: impl Into<String>) {
        self.state
            .events
            .publish(&TransportEvent::DataReceived(fragment.into()));
    }

    /// Close the connection from the robot's side
    pub fn simulate_peer_close(&self) {
        if self.state.connected.swap(false, Ordering::SeqCst) {
            self.publish_state(RobotConnectionState::Disconnected);
        }
    }

    fn publish_state(&self, state: RobotConnectionState) {
        self.state
            .events
            .publish(&TransportEvent::ConnectionChanged(state));
    }

    fn next_response(&self, command: &str) -> MockResponse {
        if let Some(response) = self.state.scripted.lock().pop_front() {
            return response;
        }
        match self.state.responder.lock().as_mut() {
            Some(responder) => responder(command),
            None => MockResponse::Silent,
        }
    }

    fn deliver(&self, fragments: Vec<String>) {
        match self.state.config.response_delay {
            None => {
                for fragment in fragments {
                    self.push_unsolicited(fragment);
                }
            }
            Some(delay) => {
                let mock = self.clone();
                tokio::spawn(async move {
                    for fragment in fragments {
                        tokio::time::sleep(delay).await;
                        if !mock.state.connected.load(Ordering::SeqCst) {
                            return;
                        }
                        mock.push_unsolicited(fragment);
                    }
                });
            }
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _blocking: bool) -> bool {
        self.state.connect_count.fetch_add(1, Ordering::SeqCst);
        if self.state.config.refuse_connections {
            self.publish_state(RobotConnectionState::Disconnected);
            return false;
        }
        self.state.connected.store(true, Ordering::SeqCst);
        self.publish_state(RobotConnectionState::Connected);
        true
    }

    async fn send(&self, bytes: &[u8]) -> bool {
        if !self.state.connected.load(Ordering::SeqCst) {
            return false;
        }

        let command = decode_ascii(bytes);
        let response = self.next_response(&command);
        self.state.sent.lock().push(command);

        match response {
            MockResponse::Reply(text) => self.deliver(vec![text]),
            MockResponse::Fragments(fragments) => self.deliver(fragments),
            MockResponse::Silent => {}
            MockResponse::FailSend => return false,
        }
        true
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self, force: bool) {
        if self.state.connected.swap(false, Ordering::SeqCst) && force {
            self.publish_state(RobotConnectionState::Disconnected);
        }
    }

    fn dispose(&self) {
        self.state.dispose_count.fetch_add(1, Ordering::SeqCst);
        if self.state.connected.swap(false, Ordering::SeqCst) {
            self.publish_state(RobotConnectionState::Disconnected);
        }
    }

    fn subscribe(&self, handler: EventHandler) -> SubscriptionId {
        self.state.events.subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.events.unsubscribe(id)
    }
}
