//! Status - summary views of the queue and of one tick

use serde::{Deserialize, Serialize};

/// Number of tracked tasks per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.pending + self.succeeded + self.failed
    }
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Status queries issued.
    pub polled: usize,
    pub still_pending: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Queries that errored or timed out; retried next tick.
    pub transient_errors: usize,
}

impl TickReport {
    pub fn is_noop(&self) -> bool {
        self.polled == 0
    }
}
