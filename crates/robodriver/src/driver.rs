//! Device-driver facade
//!
//! String-in, string-out surface for a scheduler. Every method answers with
//! an empty string on success (or the robot's reply) and a human-readable
//! message otherwise; nothing here returns an error.

use crate::config::EngineConfig;
use crate::engine::{CommandEngine, Connector, tcp_connector};
use tracing::{info, warn};

/// Returned by [`DeviceDriver::open_connection`] when the robot is unreachable
pub const CONNECTION_FAILED: &str = "Failed To connect to Robot!";

/// Returned by every other method when there is no live connection
pub const NO_CONNECTION: &str = "There is no connection with the Robot!";

/// Scheduler-facing robot driver
///
/// Owns at most one [`CommandEngine`]. [`abort`](Self::abort) disposes it;
/// the next [`open_connection`](Self::open_connection) creates a fresh one.
///
/// # Example
///
/// ```no_run
/// use robodriver::DeviceDriver;
///
/// # async fn example() {
/// let mut driver = DeviceDriver::new();
/// if driver.open_connection("127.0.0.30").await.is_empty() {
///     let process_id = driver.initialise().await;
///     let reply = driver
///         .execute_operation("pick", &["Destination Location"], &["5"])
///         .await;
///     println!("home -> {process_id}, pick -> {reply}");
///     driver.abort();
/// }
/// # }
/// ```
pub struct DeviceDriver {
    config: EngineConfig,
    connector: Connector,
    engine: Option<CommandEngine>,
}

impl DeviceDriver {
    /// Driver with default configuration, connecting over TCP
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Driver with custom configuration, connecting over TCP
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_connector(config, tcp_connector())
    }

    /// Driver whose engines obtain their transport from `connector`
    pub fn with_connector(config: EngineConfig, connector: Connector) -> Self {
        Self {
            config,
            connector,
            engine: None,
        }
    }

    /// The current engine, if a connection was opened and not aborted
    pub fn engine(&self) -> Option<&CommandEngine> {
        self.engine.as_ref()
    }

    /// Connect to the robot at `ip_address`.
    ///
    /// Returns `""` on success, [`CONNECTION_FAILED`] otherwise.
    pub async fn open_connection(&mut self, ip_address: &str) -> String {
        let engine = self.engine.get_or_insert_with(|| {
            CommandEngine::with_connector(self.config.clone(), self.connector.clone())
        });

        engine.connect(ip_address).await;
        if !engine.is_connected() {
            warn!(ip_address, "failed to connect to robot");
            return CONNECTION_FAILED.to_string();
        }
        String::new()
    }

    /// Home the robot and return the process id as text (`"-1"` on failure)
    pub async fn initialise(&mut self) -> String {
        match self.connected_engine() {
            Some(engine) => engine.set_automation_ready().await.to_string(),
            None => NO_CONNECTION.to_string(),
        }
    }

    /// Validate and run a scheduled operation.
    ///
    /// Checks, in order: connection, operation name, parameter count, robot
    /// availability. Returns the first failing check's message, otherwise the
    /// robot's reply (empty if it never answered).
    pub async fn execute_operation<S: AsRef<str>>(
        &mut self,
        operation: &str,
        parameter_names: &[S],
        parameter_values: &[S],
    ) -> String {
        let Some(engine) = self.connected_engine() else {
            return NO_CONNECTION.to_string();
        };

        let operation = operation.to_lowercase();

        if !engine.is_valid_operation(&operation) {
            return format!("Invalid Requested Operation! op:{}", operation);
        }

        if !engine.is_valid_cmd_parameters(&operation, parameter_names, parameter_values) {
            return format!(
                "Invalid Number of Parameters! op: {} pnames: {} pvalues:{}",
                operation,
                join(parameter_names),
                join(parameter_values)
            );
        }

        let current = engine.current_process_id();
        if !engine.is_robot_available(current).await {
            return format!("Robot is not available! Currently processing \"{}\"", current);
        }

        match engine
            .execute_command(&operation, parameter_names, parameter_values)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(%operation, error = %err, "operation failed");
                String::new()
            }
        }
    }

    /// Close the connection and drop the engine.
    ///
    /// Returns `""`, or [`NO_CONNECTION`] if there was nothing to abort.
    pub fn abort(&mut self) -> String {
        if self.connected_engine().is_none() {
            return NO_CONNECTION.to_string();
        }
        if let Some(engine) = self.engine.take() {
            engine.dispose();
        }
        info!("aborted");
        String::new()
    }

    fn connected_engine(&self) -> Option<&CommandEngine> {
        self.engine.as_ref().filter(|engine| engine.is_connected())
    }
}

impl Default for DeviceDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn join<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}
