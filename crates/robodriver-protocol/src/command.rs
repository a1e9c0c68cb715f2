//! Outbound command encoding
//!
//! A command is the operation name, the `%` delimiter, then every parameter
//! name immediately followed by its value. No separators, no terminator:
//!
//! ```text
//! transfer%Source Location1Destination Location2
//! ```

use crate::error::{ProtocolError, Result};
use crate::operation::Operation;
use crate::types::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separates the operation name from its parameters on the wire
pub const OPERATION_DELIMITER: char = '%';

/// A command ready to be sent to the robot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    operation: String,
    params: Vec<(String, String)>,
}

impl Command {
    /// Create a command with no parameters
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: Vec::new(),
        }
    }

    /// Append a (name, value) parameter pair
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Build a command from parallel name and value lists.
    ///
    /// The lists must be the same length; pairs are kept in input order.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ParameterMismatch`] if the lengths differ.
    pub fn from_parts<N, V>(operation: impl Into<String>, names: &[N], values: &[V]) -> Result<Self>
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let operation = operation.into();
        if names.len() != values.len() {
            return Err(ProtocolError::ParameterMismatch {
                operation,
                names: names.len(),
                values: values.len(),
            });
        }

        let params = names
            .iter()
            .zip(values)
            .map(|(n, v)| (n.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        Ok(Self { operation, params })
    }

    /// `home%`
    pub fn home() -> Self {
        Self::new(Operation::Home.as_str())
    }

    /// `status%<id>`
    ///
    /// The id is written as the parameter value with an empty name.
    pub fn status(process_id: ProcessId) -> Self {
        Self::new(Operation::Status.as_str()).with_param("", process_id.to_string())
    }

    /// Operation name as given
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Parameter pairs in send order
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Render the wire text
    pub fn encode(&self) -> String {
        let capacity = self.operation.len()
            + 1
            + self
                .params
                .iter()
                .map(|(n, v)| n.len() + v.len())
                .sum::<usize>();

        let mut out = String::with_capacity(capacity);
        out.push_str(&self.operation);
        out.push(OPERATION_DELIMITER);
        for (name, value) in &self.params {
            out.push_str(name);
            out.push_str(value);
        }
        out
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_without_params() {
        assert_eq!(Command::new("pick").encode(), "pick%");
        assert_eq!(Command::home().encode(), "home%");
    }

    #[test]
    fn test_encode_pairs_in_order() {
        let cmd = Command::new("transfer")
            .with_param("Source Location", "1")
            .with_param("Destination Location", "2");
        assert_eq!(
            cmd.encode(),
            "transfer%Source Location1Destination Location2"
        );
    }

    #[test]
    fn test_status_command() {
        assert_eq!(Command::status(ProcessId::new(42)).encode(), "status%42");
        assert_eq!(Command::status(ProcessId::NONE).encode(), "status%-1");
    }

    #[test]
    fn test_from_parts() {
        let cmd = Command::from_parts("pick", &["Destination Location"], &["5"]).unwrap();
        assert_eq!(cmd.operation(), "pick");
        assert_eq!(cmd.params().len(), 1);
        assert_eq!(cmd.to_string(), "pick%Destination Location5");
    }

    #[test]
    fn test_from_parts_length_mismatch() {
        let err = Command::from_parts("transfer", &["a"], &["1", "2"]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::ParameterMismatch {
                operation: "transfer".to_string(),
                names: 1,
                values: 2,
            }
        );
    }

    #[test]
    fn test_operation_text_is_not_normalized() {
        let cmd = Command::new("MyTransferOp").with_param("x", "y");
        assert_eq!(cmd.encode(), "MyTransferOp%xy");
    }
}
