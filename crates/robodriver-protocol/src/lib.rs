//! Wire format and shared vocabulary for the robodriver text protocol
//!
//! This crate provides the pure data side of talking to a robot over a raw
//! TCP stream. The transport and the command engine both build on it, so the
//! command syntax, the status phrases and the process-id rules live in one
//! place.
//!
//! # Type Organization
//!
//! - **Commands**: [`command`] - `operation%name1value1name2value2…` encoding
//! - **Operations**: [`operation`] - allowed operations and parameter arity
//! - **Status**: [`status`] - status-reply phrases and their classification
//! - **Common types**: [`types`] - process ids, connection state, ASCII codec
//! - **Error types**: [`error`] - protocol validation errors
//!
//! # Wire Format
//!
//! ```text
//! home%                          put the robot in its automation-ready state
//! pick%Destination Location5     one parameter: name and value concatenated
//! status%3                       poll process 3
//! ```
//!
//! There is no framing: every socket read is one fragment, and replies are
//! free text matched by substring.
//!
//! # Design Principles
//!
//! - **Zero I/O**: All types are pure data structures
//! - **No hidden state**: encoding and classification are plain functions
//! - **No circular dependencies**: robodriver-protocol depends only on serde

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```rust
//! use robodriver_protocol::{Command, ProcessId, RobotStatus};
//!
//! let cmd = Command::new("pick").with_param("Destination Location", "5");
//! assert_eq!(cmd.encode(), "pick%Destination Location5");
//!
//! assert_eq!(Command::status(ProcessId::new(3)).encode(), "status%3");
//! assert!(RobotStatus::classify("Finished Successfully").is_available());
//! ```

pub mod command;
pub mod error;
pub mod operation;
pub mod status;
pub mod types;

// Re-export commonly used types at crate level
pub use command::{Command, OPERATION_DELIMITER};
pub use error::{ProtocolError, Result};
pub use operation::{ALLOWED_OPERATIONS, Operation, OperationMatch};
pub use status::{
    FINISHED_SUCCESSFULLY, IN_PROGRESS, RobotStatus, STATUS_PHRASES, TERMINATED_WITH_ERROR,
};
pub use types::{ProcessId, RobotConnectionState, decode_ascii, encode_ascii};
