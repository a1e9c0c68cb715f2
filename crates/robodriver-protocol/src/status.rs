//! Status replies
//!
//! The robot answers `status%<id>` with free text. Three phrases carry
//! meaning; anything else is treated as the robot still being busy.

use serde::{Deserialize, Serialize};

/// Reply phrase for a process that is still running
pub const IN_PROGRESS: &str = "In Progress";

/// Reply phrase for a process that completed normally
pub const FINISHED_SUCCESSFULLY: &str = "Finished Successfully";

/// Reply phrase for a process that stopped on an error
pub const TERMINATED_WITH_ERROR: &str = "Terminated With Error";

/// Every phrase a status reply is expected to contain
pub const STATUS_PHRASES: [&str; 3] = [IN_PROGRESS, FINISHED_SUCCESSFULLY, TERMINATED_WITH_ERROR];

/// Classified status reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    /// The process is still running
    InProgress,
    /// The process completed normally
    FinishedSuccessfully,
    /// The process stopped on an error
    TerminatedWithError,
    /// Empty or unrecognized reply
    Unknown,
}

impl RobotStatus {
    /// Classify a raw status reply by substring.
    ///
    /// A finished phrase wins over `In Progress` when a reassembled reply
    /// contains both, since the later state is the one that holds.
    pub fn classify(reply: &str) -> Self {
        if reply.contains(FINISHED_SUCCESSFULLY) {
            Self::FinishedSuccessfully
        } else if reply.contains(TERMINATED_WITH_ERROR) {
            Self::TerminatedWithError
        } else if reply.contains(IN_PROGRESS) {
            Self::InProgress
        } else {
            Self::Unknown
        }
    }

    /// Whether the robot can accept a new operation.
    ///
    /// `Unknown` counts as busy.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::FinishedSuccessfully | Self::TerminatedWithError)
    }
}
