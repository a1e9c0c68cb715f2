//! Robot operations and their parameter rules
//!
//! Only `pick`, `place` and `transfer` may be requested by a scheduler.
//! `home` and `status` are issued by the driver itself.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operations a scheduler is allowed to request.
pub const ALLOWED_OPERATIONS: [Operation; 3] =
    [Operation::Pick, Operation::Place, Operation::Transfer];

/// A named robot action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Put the robot into its automation-ready (homed) state
    Home,
    /// Pick an item up from a location
    Pick,
    /// Place the held item at a location
    Place,
    /// Move an item from a source location to a destination location
    Transfer,
    /// Query the state of a process
    Status,
}

impl Operation {
    /// Wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Pick => "pick",
            Self::Place => "place",
            Self::Transfer => "transfer",
            Self::Status => "status",
        }
    }

    /// Number of (name, value) parameter pairs the operation takes, if fixed
    pub fn parameter_count(&self) -> usize {
        match self {
            Self::Home => 0,
            Self::Pick | Self::Place => 1,
            Self::Transfer => 2,
            Self::Status => 1,
        }
    }

    /// Whether a scheduler may request this operation directly
    pub fn is_schedulable(&self) -> bool {
        ALLOWED_OPERATIONS.contains(self)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "home" => Ok(Self::Home),
            "pick" => Ok(Self::Pick),
            "place" => Ok(Self::Place),
            "transfer" => Ok(Self::Transfer),
            "status" => Ok(Self::Status),
            other => Err(ProtocolError::UnknownOperation(other.to_string())),
        }
    }
}

/// How a requested operation name is compared against the allowed set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMatch {
    /// The request is valid if it contains an allowed name anywhere
    /// (`"mytransferop"` is accepted)
    #[default]
    Contains,
    /// The request must equal an allowed name
    Exact,
}

impl OperationMatch {
    /// Check a requested operation against [`ALLOWED_OPERATIONS`].
    ///
    /// The request is lowercased before comparison.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robodriver_protocol::OperationMatch;
    ///
    /// assert!(OperationMatch::Contains.is_valid("PICK"));
    /// assert!(OperationMatch::Contains.is_valid("mytransferop"));
    /// assert!(!OperationMatch::Exact.is_valid("mytransferop"));
    /// assert!(!OperationMatch::Exact.is_valid("home"));
    /// ```
    pub fn is_valid(&self, operation: &str) -> bool {
        let operation = operation.to_lowercase();
        ALLOWED_OPERATIONS.iter().any(|allowed| match self {
            Self::Contains => operation.contains(allowed.as_str()),
            Self::Exact => operation == allowed.as_str(),
        })
    }
}

/// Check that the parameter lists fit the operation's arity.
///
/// `pick` and `place` take exactly one name and one value, `transfer` exactly
/// two of each. Any other operation name is rejected. The name is compared
/// exactly, so callers lowercase it first.
///
/// # Examples
///
/// ```rust
/// use robodriver_protocol::operation::has_valid_arity;
///
/// assert!(has_valid_arity("pick", &["x"], &["1"]));
/// assert!(!has_valid_arity("pick", &["x", "y"], &["1", "2"]));
/// assert!(has_valid_arity("transfer", &["a", "b"], &["1", "2"]));
/// assert!(!has_valid_arity("transfer", &["a"], &["1", "2"]));
/// ```
pub fn has_valid_arity<N: AsRef<str>, V: AsRef<str>>(
    operation: &str,
    names: &[N],
    values: &[V],
) -> bool {
    match operation.parse::<Operation>() {
        Ok(op) if op.is_schedulable() => {
            let expected = op.parameter_count();
            names.len() == expected && values.len() == expected
        }
        _ => false,
    }
}
