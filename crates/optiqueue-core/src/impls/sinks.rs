//! PresentationSink implementations.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::info;

use crate::domain::{DomainEvent, Task, TaskResult};
use crate::ports::PresentationSink;

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl PresentationSink for NoopSink {
    fn on_task_created(&self, _task: &Task) {}

    fn on_task_completed(&self, _task: &Task) {}

    fn on_task_failed(&self, _task: &Task) {}
}

/// Writes one structured log line per notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl PresentationSink for TracingSink {
    fn on_task_created(&self, task: &Task) {
        info!(task_id = %task.id(), label = task.label(), "task in progress");
    }

    fn on_task_completed(&self, task: &Task) {
        let containers = task.containers().map_or(0, |c| c.len());
        info!(task_id = %task.id(), label = task.label(), containers, "task completed");
    }

    fn on_task_failed(&self, task: &Task) {
        let diagnostic = match task.result() {
            Some(TaskResult::Failure(d)) => d.to_string(),
            _ => String::new(),
        };
        info!(task_id = %task.id(), label = task.label(), %diagnostic, "task failed");
    }
}

/// Forwards notifications as [`DomainEvent`]s over a channel, for consumers
/// living on another task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: DomainEvent) {
        // ignore send error: nobody is listening any more
        let _ = self.tx.send(event);
    }
}

impl PresentationSink for ChannelSink {
    fn on_task_created(&self, task: &Task) {
        self.send(DomainEvent::TaskCreated(task.clone()));
    }

    fn on_task_completed(&self, task: &Task) {
        self.send(DomainEvent::TaskCompleted(task.clone()));
    }

    fn on_task_failed(&self, task: &Task) {
        self.send(DomainEvent::TaskFailed(task.clone()));
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far, oldest first.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.lock().clone()
    }

    fn record(&self, event: DomainEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DomainEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PresentationSink for RecordingSink {
    fn on_task_created(&self, task: &Task) {
        self.record(DomainEvent::TaskCreated(task.clone()));
    }

    fn on_task_completed(&self, task: &Task) {
        self.record(DomainEvent::TaskCompleted(task.clone()));
    }

    fn on_task_failed(&self, task: &Task) {
        self.record(DomainEvent::TaskFailed(task.clone()));
    }
}
