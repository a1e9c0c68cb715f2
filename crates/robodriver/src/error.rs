//! Error types for the command engine
//!
//! Provides self-documenting errors with recovery guidance.
//! Errors implement `ErrorRecovery` trait which provides:
//! - Retriability assessment (should this attempt be repeated?)
//! - Suggested user action (what should the operator do?)
//! - Retry limits (how many times to try?)
//! - Backoff strategy (how long to wait between attempts?)

use robodriver_protocol::ProtocolError;
use std::fmt;
use std::time::Duration;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Default number of attempts for a command
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay after a failed socket write before the next attempt
pub const DEFAULT_SEND_BACKOFF_MS: u64 = 100;

/// Backoff strategy for retrying operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// No backoff (don't retry)
    None,

    /// Same delay before every retry; zero retries immediately
    Fixed {
        /// Delay in milliseconds
        delay_ms: u64,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number (1-indexed)
    pub fn delay_for_attempt(&self, _attempt: u32) -> Option<Duration> {
        match self {
            BackoffStrategy::None => None,
            BackoffStrategy::Fixed { delay_ms } => Some(Duration::from_millis(*delay_ms)),
        }
    }
}

/// Error recovery guidance trait
///
/// Errors implement this trait to provide actionable recovery guidance.
/// [`retry_with_recovery`](crate::retry::retry_with_recovery) relies on it.
pub trait ErrorRecovery {
    /// Whether this error should be retried
    fn is_retriable(&self) -> bool;

    /// User-facing action to take
    fn suggested_action(&self) -> &str;

    /// Maximum number of attempts (None = don't retry)
    fn max_retries(&self) -> Option<u32>;

    /// Backoff strategy for retries
    fn backoff_strategy(&self) -> BackoffStrategy;
}

/// Errors that can occur in engine operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No transport, or the transport is not connected
    NotConnected,

    /// One socket write failed; the attempt is repeated after `backoff_ms`
    SendFailed {
        /// Delay before the next attempt
        backoff_ms: u64,
    },

    /// One attempt's window closed without a matching reply
    NoMatch {
        /// Whatever was reassembled during the attempt
        reply: String,
    },

    /// Every attempt ran out without a matching reply
    Timeout {
        /// Number of attempts made
        attempts: u32,
        /// Text reassembled by the final attempt
        last_reply: String,
    },

    /// The transport dropped while the command was being sent
    Transport(String),

    /// The operation is not one a scheduler may request
    InvalidOperation(String),

    /// Parameter names and values do not fit the operation
    InvalidParameters(String),

    /// Invalid configuration value
    Config(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "Not connected to the robot"),
            Self::SendFailed { .. } => write!(f, "Failed to send command"),
            Self::NoMatch { reply } => write!(f, "No matching reply (got {:?})", reply),
            Self::Timeout {
                attempts,
                last_reply,
            } => write!(
                f,
                "No matching reply after {} attempt(s) (last reply {:?})",
                attempts, last_reply
            ),
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
            Self::InvalidOperation(op) => write!(f, "Invalid operation: {}", op),
            Self::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ProtocolError> for EngineError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownOperation(op) => Self::InvalidOperation(op),
            other => Self::InvalidParameters(other.to_string()),
        }
    }
}

impl ErrorRecovery for EngineError {
    fn is_retriable(&self) -> bool {
        match self {
            // A single attempt failing is expected; the budget decides.
            Self::SendFailed { .. } | Self::NoMatch { .. } => true,

            // The budget is already spent
            Self::Timeout { .. } => false,

            // The engine never reconnects on its own
            Self::NotConnected | Self::Transport(_) => false,

            // Validation and config errors are permanent
            Self::InvalidOperation(_) | Self::InvalidParameters(_) | Self::Config(_) => false,
        }
    }

    fn suggested_action(&self) -> &str {
        match self {
            Self::NotConnected => "Open a connection to the robot before sending commands.",
            Self::SendFailed { .. } => "Socket write failed. Retrying after a short delay.",
            Self::NoMatch { .. } => "Robot did not answer in time. Resending the command.",
            Self::Timeout { .. } => {
                "Robot did not answer. Check that it is running \
                and poll its status before retrying."
            }
            Self::Transport(_) => {
                "Connection to the robot was lost. \
                Reconnect and initialise again."
            }
            Self::InvalidOperation(_) => "Request one of: pick, place, transfer.",
            Self::InvalidParameters(_) => {
                "pick and place take one parameter, \
                transfer takes two."
            }
            Self::Config(_) => "Fix the configuration value and create a new engine.",
        }
    }

    fn max_retries(&self) -> Option<u32> {
        match self {
            Self::SendFailed { .. } | Self::NoMatch { .. } => Some(DEFAULT_MAX_ATTEMPTS),
            _ => None,
        }
    }

    fn backoff_strategy(&self) -> BackoffStrategy {
        match self {
            // Back off before rewriting to a failing socket
            Self::SendFailed { backoff_ms } => BackoffStrategy::Fixed {
                delay_ms: *backoff_ms,
            },

            // The reply window already elapsed
            Self::NoMatch { .. } => BackoffStrategy::Fixed { delay_ms: 0 },

            _ => BackoffStrategy::None,
        }
    }
}
