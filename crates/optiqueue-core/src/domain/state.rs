//! Task lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a tracked optimization job.
///
/// State transitions:
/// - Pending -> Success
/// - Pending -> Failure
///
/// `Success` and `Failure` are terminal. Serialized as SCREAMING_SNAKE_CASE
/// to match the names the job service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Submitted, result not known yet.
    Pending,

    /// The service produced a layout.
    Success,

    /// The service reported the job as failed.
    Failure,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }
}
