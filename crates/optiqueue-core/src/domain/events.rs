//! Events - task lifecycle events

use serde::{Deserialize, Serialize};

use super::Task;

/// A task lifecycle change, carrying a snapshot of the task right after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "task", rename_all = "snake_case")]
pub enum DomainEvent {
    TaskCreated(Task),
    TaskCompleted(Task),
    TaskFailed(Task),
}

impl DomainEvent {
    pub fn task(&self) -> &Task {
        match self {
            DomainEvent::TaskCreated(task)
            | DomainEvent::TaskCompleted(task)
            | DomainEvent::TaskFailed(task) => task,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TaskCreated(_) => "task_created",
            DomainEvent::TaskCompleted(_) => "task_completed",
            DomainEvent::TaskFailed(_) => "task_failed",
        }
    }
}
