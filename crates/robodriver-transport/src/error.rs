//! Transport error types

use std::fmt;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur in transport operations
///
/// These never reach the command engine directly: the [`Transport`](crate::Transport)
/// methods report failure as `false` and a `Disconnected` event, and the
/// error is logged where it happens.
#[derive(Debug)]
pub enum TransportError {
    /// Connection could not be established
    Connection(String),

    /// I/O error on an established socket
    Io(std::io::Error),

    /// The remote address is not a valid IP address
    InvalidAddress(String),

    /// The transport was disposed
    Disposed,

    /// Generic transport error
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "Connection error: {}", msg),
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::InvalidAddress(addr) => write!(f, "Invalid address: {}", addr),
            Self::Disposed => write!(f, "Transport disposed"),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
