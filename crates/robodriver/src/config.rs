//! Command engine configuration

use crate::error::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SEND_BACKOFF_MS, EngineError, Result};
use robodriver_protocol::OperationMatch;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default robot port
pub const DEFAULT_PORT: u16 = 1000;

/// How an attempt waits for the robot's reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rendezvous {
    /// Wake on every arriving fragment and stop as soon as the reassembled
    /// reply contains an expected phrase; replies without expected phrases
    /// are collected until the window closes
    #[default]
    Signaled,
    /// Sleep for the whole window, then drain once
    FixedSleep,
}

/// Configuration for a command engine
///
/// Controls where the engine connects and how long it waits for the robot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Robot TCP port
    pub port: u16,

    /// Reply window for `home` and scheduled operations
    pub command_timeout: Duration,

    /// Reply window for status queries
    pub status_timeout: Duration,

    /// Attempts per command, including the first
    pub max_attempts: u32,

    /// Delay after a failed socket write
    pub send_backoff: Duration,

    /// Whether `connect` waits for the socket to be established
    pub blocking_connect: bool,

    /// Reply wait strategy
    pub rendezvous: Rendezvous,

    /// Operation-name validation mode
    pub operation_match: OperationMatch,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            command_timeout: Duration::from_millis(100),
            status_timeout: Duration::from_millis(2000),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            send_backoff: Duration::from_millis(DEFAULT_SEND_BACKOFF_MS),
            blocking_connect: true,
            rendezvous: Rendezvous::default(),
            operation_match: OperationMatch::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new engine config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults:
    /// - `ROBODRIVER_PORT`
    /// - `ROBODRIVER_COMMAND_TIMEOUT_MS`
    /// - `ROBODRIVER_STATUS_TIMEOUT_MS`
    /// - `ROBODRIVER_MAX_ATTEMPTS`
    /// - `ROBODRIVER_SEND_BACKOFF_MS`
    /// - `ROBODRIVER_BLOCKING_CONNECT` (`true`/`false`/`1`/`0`)
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if a variable is set but cannot be
    /// parsed, or if the result fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_var::<u16>("ROBODRIVER_PORT")? {
            config.port = port;
        }
        if let Some(ms) = env_var::<u64>("ROBODRIVER_COMMAND_TIMEOUT_MS")? {
            config.command_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_var::<u64>("ROBODRIVER_STATUS_TIMEOUT_MS")? {
            config.status_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = env_var::<u32>("ROBODRIVER_MAX_ATTEMPTS")? {
            config.max_attempts = attempts;
        }
        if let Some(ms) = env_var::<u64>("ROBODRIVER_SEND_BACKOFF_MS")? {
            config.send_backoff = Duration::from_millis(ms);
        }
        if let Ok(raw) = std::env::var("ROBODRIVER_BLOCKING_CONNECT") {
            config.blocking_connect = parse_bool(&raw).ok_or_else(|| {
                EngineError::Config(format!("ROBODRIVER_BLOCKING_CONNECT: {:?}", raw))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(EngineError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.command_timeout.is_zero() || self.status_timeout.is_zero() {
            return Err(EngineError::Config(
                "reply windows must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the robot port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the reply window for commands
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the reply window for status queries
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    /// Set the attempts per command
    ///
    /// Minimum is 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = std::cmp::max(attempts, 1);
        self
    }

    /// Set the delay after a failed socket write
    pub fn with_send_backoff(mut self, backoff: Duration) -> Self {
        self.send_backoff = backoff;
        self
    }

    /// Choose whether `connect` waits for the outcome
    pub fn with_blocking_connect(mut self, blocking: bool) -> Self {
        self.blocking_connect = blocking;
        self
    }

    /// Set the reply wait strategy
    pub fn with_rendezvous(mut self, rendezvous: Rendezvous) -> Self {
        self.rendezvous = rendezvous;
        self
    }

    /// Set the operation validation mode
    pub fn with_operation_match(mut self, mode: OperationMatch) -> Self {
        self.operation_match = mode;
        self
    }
}

fn env_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EngineError::Config(format!("{}: {:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
