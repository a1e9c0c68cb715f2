//! Command engine
//!
//! Turns operations into wire commands, pushes them through a [`Transport`]
//! and waits for the robot's reply. Replies arrive as fragments on the
//! transport's receive task; the engine's data handler queues them and each
//! attempt drains the queue into one reassembled reply.
//!
//! Per command:
//!
//! ```text
//! Idle → Sent → Matched                       (Ok)
//!             → Unmatched → Sent …            (while attempts remain)
//!             → Exhausted                     (Err(Timeout))
//! ```
//!
//! One command is in flight at a time. Callers await each operation before
//! issuing the next.

use crate::config::{EngineConfig, Rendezvous};
use crate::error::{EngineError, Result};
use crate::retry::retry_with_recovery;
use parking_lot::Mutex;
use robodriver_core::{DisposeGuard, FragmentQueue};
use robodriver_protocol::operation::has_valid_arity;
use robodriver_protocol::{
    Command, ProcessId, RobotConnectionState, RobotStatus, STATUS_PHRASES, encode_ascii,
};
use robodriver_transport::{
    EventHandler, SubscriptionId, TcpTransport, Transport, TransportError, TransportEvent,
};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Creates the transport for `(address, port)` on every connect
pub type Connector = Arc<
    dyn Fn(&str, u16) -> std::result::Result<Arc<dyn Transport>, TransportError> + Send + Sync,
>;

/// Connector producing a [`TcpTransport`]
pub fn tcp_connector() -> Connector {
    Arc::new(|address, port| {
        let transport: Arc<dyn Transport> = Arc::new(TcpTransport::new(address, port)?);
        Ok(transport)
    })
}

/// A reply that satisfied its command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reassembled reply text
    pub text: String,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Timing and matching rules for one send-with-retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// How long each attempt waits for a reply
    pub window: Duration,
    /// Attempts, including the first
    pub max_attempts: u32,
    /// If set, the reply must contain at least one of these
    pub expected: Option<Vec<String>>,
}

impl SendOptions {
    /// Options with the given window, one attempt and no filter
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            max_attempts: 1,
            expected: None,
        }
    }

    /// Set the attempt budget (minimum 1)
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Require the reply to contain one of `phrases`
    pub fn expecting(mut self, phrases: &[&str]) -> Self {
        self.expected = Some(phrases.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Whether `reply` completes the command
    pub fn accepts(&self, reply: &str) -> bool {
        if reply.trim().is_empty() {
            return false;
        }
        match &self.expected {
            Some(phrases) => phrases.iter().any(|p| reply.contains(p.as_str())),
            None => true,
        }
    }
}

/// Transport currently owned by the engine, with the engine's subscriptions
struct Link {
    transport: Arc<dyn Transport>,
    data_subscription: SubscriptionId,
    state_subscription: SubscriptionId,
}

/// Drives a robot over a single transport
pub struct CommandEngine {
    config: EngineConfig,
    connector: Connector,
    // Also the event lock: subscriptions change only while it is held.
    link: Mutex<Option<Link>>,
    inbound: Arc<FragmentQueue>,
    process_id: AtomicI32,
    link_up: Arc<AtomicBool>,
    guard: DisposeGuard,
}

impl CommandEngine {
    /// Engine that connects over TCP
    pub fn new(config: EngineConfig) -> Self {
        Self::with_connector(config, tcp_connector())
    }

    /// Engine that obtains its transport from `connector`
    pub fn with_connector(config: EngineConfig, connector: Connector) -> Self {
        Self {
            config,
            connector,
            link: Mutex::new(None),
            inbound: Arc::new(FragmentQueue::new()),
            process_id: AtomicI32::new(ProcessId::NONE.get()),
            link_up: Arc::new(AtomicBool::new(false)),
            guard: DisposeGuard::new(),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Connect to the robot at `ip_address`, replacing any current transport.
    ///
    /// With `blocking_connect` the result is the outcome of the attempt;
    /// otherwise `true` means the attempt was started.
    #[instrument(skip(self), fields(port = self.config.port))]
    pub async fn connect(&self, ip_address: &str) -> bool {
        if self.guard.is_disposed() {
            warn!("connect on a disposed engine");
            return false;
        }

        self.close();
        self.inbound.clear();

        let transport = match (self.connector)(ip_address, self.config.port) {
            Ok(transport) => transport,
            Err(err) => {
                warn!(error = %err, "cannot create transport");
                return false;
            }
        };

        let installed = self.guard.while_live(|| {
            let mut link = self.link.lock();
            let state_subscription = transport.subscribe(self.state_handler());
            let data_subscription = transport.subscribe(self.data_handler());
            *link = Some(Link {
                transport: Arc::clone(&transport),
                data_subscription,
                state_subscription,
            });
        });
        if installed.is_none() {
            transport.dispose();
            return false;
        }

        let connected = transport.connect(self.config.blocking_connect).await;
        debug!(connected, "connect finished");
        connected
    }

    /// Whether the live transport reports a connection
    pub fn is_connected(&self) -> bool {
        self.transport().is_some_and(|t| t.is_connected())
    }

    /// Last state reported by the transport
    pub fn connection_state(&self) -> RobotConnectionState {
        if self.link_up.load(Ordering::SeqCst) {
            RobotConnectionState::Connected
        } else {
            RobotConnectionState::Disconnected
        }
    }

    /// Most recent process id; [`ProcessId::NONE`] if none was established
    pub fn current_process_id(&self) -> ProcessId {
        ProcessId::new(self.process_id.load(Ordering::SeqCst))
    }

    /// Put the robot into its automation-ready state.
    ///
    /// Sends `home%` and records the process id from the reply, or
    /// [`ProcessId::NONE`] if there was no usable reply.
    #[instrument(skip(self))]
    pub async fn set_automation_ready(&self) -> ProcessId {
        let options =
            SendOptions::new(self.config.command_timeout).with_attempts(self.config.max_attempts);

        let process_id = match self.send_with_retry(&Command::home().encode(), &options).await {
            Ok(reply) => parse_process_id(&reply.text),
            Err(err) => {
                warn!(error = %err, "home command failed");
                ProcessId::NONE
            }
        };

        self.process_id.store(process_id.get(), Ordering::SeqCst);
        info!(%process_id, "automation ready");
        process_id
    }

    /// Whether a scheduler may request `operation`
    pub fn is_valid_operation(&self, operation: &str) -> bool {
        self.config.operation_match.is_valid(operation)
    }

    /// Whether the parameter lists fit `operation`
    pub fn is_valid_cmd_parameters<N: AsRef<str>, V: AsRef<str>>(
        &self,
        operation: &str,
        names: &[N],
        values: &[V],
    ) -> bool {
        has_valid_arity(operation, names, values)
    }

    /// Whether the robot has finished `process_id`.
    ///
    /// Any reply other than a finished phrase counts as busy, as does a
    /// status query that failed.
    #[instrument(skip(self))]
    pub async fn is_robot_available(&self, process_id: ProcessId) -> bool {
        match self.get_robot_status(process_id).await {
            Ok(reply) => RobotStatus::classify(&reply).is_available(),
            Err(err) => {
                debug!(error = %err, "status unavailable, assuming busy");
                false
            }
        }
    }

    /// Query the status of `process_id` and return the raw reply
    #[instrument(skip(self))]
    pub async fn get_robot_status(&self, process_id: ProcessId) -> Result<String> {
        let options = SendOptions::new(self.config.status_timeout)
            .with_attempts(self.config.max_attempts)
            .expecting(&STATUS_PHRASES);

        let reply = self
            .send_with_retry(&Command::status(process_id).encode(), &options)
            .await?;
        Ok(reply.text)
    }

    /// Send `operation` with its parameters and return the robot's reply.
    ///
    /// On success the reply is parsed as the new process id.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidOperation`] and
    /// [`EngineError::InvalidParameters`] are returned before anything is
    /// sent; otherwise as [`send_with_retry`](Self::send_with_retry).
    #[instrument(skip(self, names, values), fields(params = names.len()))]
    pub async fn execute_command<N: AsRef<str>, V: AsRef<str>>(
        &self,
        operation: &str,
        names: &[N],
        values: &[V],
    ) -> Result<String> {
        if !self.is_valid_operation(operation) {
            return Err(EngineError::InvalidOperation(operation.to_string()));
        }
        let command = Command::from_parts(operation, names, values)?;
        let options =
            SendOptions::new(self.config.command_timeout).with_attempts(self.config.max_attempts);

        let reply = self.send_with_retry(&command.encode(), &options).await?;
        let process_id = parse_process_id(&reply.text);
        self.process_id.store(process_id.get(), Ordering::SeqCst);
        Ok(reply.text)
    }

    /// Send `command` until a reply satisfies `options` or attempts run out.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotConnected`] if there is no live connection
    /// - [`EngineError::Timeout`] if no attempt produced a matching reply
    /// - [`EngineError::Transport`] if the connection dropped while sending
    #[instrument(skip(self, options), fields(attempts = options.max_attempts))]
    pub async fn send_with_retry(&self, command: &str, options: &SendOptions) -> Result<Reply> {
        let transport = match self.transport() {
            Some(transport) if transport.is_connected() => transport,
            _ => return Err(EngineError::NotConnected),
        };

        let payload = encode_ascii(command);
        let max_attempts = options.max_attempts.max(1);

        let result = retry_with_recovery(
            |attempt| self.attempt(transport.as_ref(), &payload, options, attempt),
            Some(max_attempts),
        )
        .await;

        match result {
            Ok(reply) => {
                debug!(attempts = reply.attempts, reply = %reply.text, "command answered");
                Ok(reply)
            }
            Err(EngineError::NoMatch { reply }) => {
                warn!(last_reply = %reply, "no matching reply");
                Err(EngineError::Timeout {
                    attempts: max_attempts,
                    last_reply: reply,
                })
            }
            Err(EngineError::SendFailed { .. }) if !transport.is_connected() => {
                warn!("connection lost while sending");
                Err(EngineError::Transport(
                    "connection lost while sending".to_string(),
                ))
            }
            Err(EngineError::SendFailed { .. }) => Err(EngineError::Timeout {
                attempts: max_attempts,
                last_reply: String::new(),
            }),
            Err(other) => Err(other),
        }
    }

    /// Unsubscribe from the transport and dispose it.
    ///
    /// The engine stays usable; a later [`connect`](Self::connect) opens a
    /// new transport.
    pub fn close(&self) {
        let link = self.link.lock().take();
        if let Some(link) = link {
            release(link);
        }
    }

    /// Close for good. Idempotent; also run on drop.
    pub fn dispose(&self) {
        let mut link = None;
        let disposed = self.guard.dispose_with(|| {
            link = self.link.lock().take();
        });
        if let Some(link) = link {
            release(link);
        }
        if disposed {
            debug!("engine disposed");
        }
    }

    /// Whether [`dispose`](Self::dispose) has run
    pub fn is_disposed(&self) -> bool {
        self.guard.is_disposed()
    }

    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.link
            .lock()
            .as_ref()
            .map(|link| Arc::clone(&link.transport))
    }

    /// One send and its reply window
    async fn attempt(
        &self,
        transport: &dyn Transport,
        payload: &[u8],
        options: &SendOptions,
        attempt: u32,
    ) -> Result<Reply> {
        if !transport.send(payload).await {
            let backoff_ms = u64::try_from(self.config.send_backoff.as_millis()).unwrap_or(u64::MAX);
            return Err(EngineError::SendFailed { backoff_ms });
        }

        let text = match self.config.rendezvous {
            Rendezvous::Signaled => self.collect_until_match(options).await,
            Rendezvous::FixedSleep => {
                tokio::time::sleep(options.window).await;
                self.inbound.drain()
            }
        };

        if options.accepts(&text) {
            Ok(Reply {
                text,
                attempts: attempt,
            })
        } else {
            Err(EngineError::NoMatch { reply: text })
        }
    }

    /// Accumulate fragments until an expected phrase arrives or the window
    /// closes.
    ///
    /// Without expected phrases the whole window is collected, so a reply
    /// split across reads comes back complete.
    async fn collect_until_match(&self, options: &SendOptions) -> String {
        let deadline = Instant::now() + options.window;
        let mut reply = String::new();

        while self.inbound.wait_until(deadline).await {
            reply.push_str(&self.inbound.drain());
            if options.expected.is_some() && options.accepts(&reply) {
                break;
            }
            if Instant::now() >= deadline {
                break;
            }
        }
        reply
    }

    fn data_handler(&self) -> EventHandler {
        let inbound = Arc::clone(&self.inbound);
        Arc::new(move |event: &TransportEvent| {
            if let TransportEvent::DataReceived(fragment) = event {
                debug!(%fragment, "received data");
                inbound.push(fragment.trim());
            }
        })
    }

    fn state_handler(&self) -> EventHandler {
        let link_up = Arc::clone(&self.link_up);
        Arc::new(move |event: &TransportEvent| {
            if let TransportEvent::ConnectionChanged(state) = event {
                info!(%state, "connection status");
                link_up.store(
                    *state == RobotConnectionState::Connected,
                    Ordering::SeqCst,
                );
            }
        })
    }
}

/// Detach the engine's handlers and dispose the transport
fn release(link: Link) {
    link.transport.unsubscribe(link.data_subscription);
    link.transport.dispose();
    link.transport.unsubscribe(link.state_subscription);
}

fn parse_process_id(reply: &str) -> ProcessId {
    reply.parse().unwrap_or_else(|err| {
        warn!(error = %err, "reply is not a process id");
        ProcessId::NONE
    })
}

impl Drop for CommandEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEngine")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .field("process_id", &self.current_process_id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
