//! Error types for protocol operations
//!
//! Provides error types for command validation and reply parsing.

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while building commands or reading replies
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The reply text is not a bare integer process identifier
    #[error("Invalid process id: {0:?}")]
    InvalidProcessId(String),

    /// The operation name is not one the robot accepts
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Parameter names and values do not pair up for the operation
    #[error(
        "Parameter mismatch for {operation}: {names} name(s), {values} value(s)"
    )]
    ParameterMismatch {
        /// The operation the parameters were meant for.
        operation: String,
        /// Number of parameter names supplied.
        names: usize,
        /// Number of parameter values supplied.
        values: usize,
    },
}
