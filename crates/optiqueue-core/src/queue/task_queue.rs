//! In-memory task queue.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::app::status::QueueCounts;
use crate::domain::{Task, TaskId, TaskState, WasteContainer};
use crate::error::QueueError;

/// Queue handle shared by submission and the reconciler.
pub type SharedQueue = Arc<Mutex<TaskQueue>>;

/// Ordered collection of tracked tasks.
///
/// Design:
/// - `tasks` is the single source of truth; `index` maps ids to positions.
/// - Insertion order is submission order and never changes.
/// - Append-only: tasks are never removed.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedQueue {
        Arc::new(Mutex::new(self))
    }

    /// Append a new task. Duplicate ids are rejected and leave the queue
    /// untouched.
    pub fn push(&mut self, task: Task) -> Result<&Task, QueueError> {
        if self.index.contains_key(task.id()) {
            return Err(QueueError::DuplicateTask(task.id().clone()));
        }
        let pos = self.tasks.len();
        self.index.insert(task.id().clone(), pos);
        self.tasks.push(task);
        Ok(&self.tasks[pos])
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&Task> {
        self.index.get(task_id).map(|&pos| &self.tasks[pos])
    }

    /// Tasks in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ids of tasks still waiting for a result, in submission order.
    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.state() == TaskState::Pending)
            .map(|t| t.id().clone())
            .collect()
    }

    /// True when there is nothing left to poll.
    pub fn is_settled(&self) -> bool {
        self.tasks.iter().all(|t| t.state().is_terminal())
    }

    /// Pending -> Success for one task.
    pub fn complete(
        &mut self,
        task_id: &TaskId,
        containers: Vec<WasteContainer>,
        now: DateTime<Utc>,
    ) -> Result<&Task, QueueError> {
        let task = self.get_mut(task_id)?;
        task.complete(containers, now)?;
        Ok(&*task)
    }

    /// Pending -> Failure for one task.
    pub fn fail(
        &mut self,
        task_id: &TaskId,
        diagnostic: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<&Task, QueueError> {
        let task = self.get_mut(task_id)?;
        task.fail(diagnostic, now)?;
        Ok(&*task)
    }

    pub fn counts_by_state(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for task in &self.tasks {
            match task.state() {
                TaskState::Pending => counts.pending += 1,
                TaskState::Success => counts.succeeded += 1,
                TaskState::Failure => counts.failed += 1,
            }
        }
        counts
    }

    fn get_mut(&mut self, task_id: &TaskId) -> Result<&mut Task, QueueError> {
        match self.index.get(task_id) {
            Some(&pos) => Ok(&mut self.tasks[pos]),
            None => Err(QueueError::UnknownTask(task_id.clone())),
        }
    }
}
