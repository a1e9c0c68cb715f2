//! Common type definitions used across the protocol
//!
//! Process identifiers, the observable connection state and the ASCII codec
//! applied to every byte that crosses the socket.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of an in-flight robot process
///
/// Returned as a bare integer in reply to every non-status command and used
/// later to poll `status%<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(i32);

impl ProcessId {
    /// Sentinel for "no process established"
    pub const NONE: Self = Self(-1);

    /// Wrap a raw identifier
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw integer value
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Whether this is the [`NONE`](Self::NONE) sentinel
    pub const fn is_none(&self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ProcessId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl FromStr for ProcessId {
    type Err = ProtocolError;

    /// Parse a reply as a bare integer, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i32>()
            .map(Self)
            .map_err(|_| ProtocolError::InvalidProcessId(s.to_string()))
    }
}

/// Connection state published on every transport lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotConnectionState {
    /// No socket, or the socket was closed
    #[default]
    Disconnected,
    /// Socket established
    Connected,
}

impl fmt::Display for RobotConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

/// Encode text for the wire; non-ASCII characters become `?`
pub fn encode_ascii(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// Decode one received chunk; bytes above 0x7F become `?`
pub fn decode_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}
