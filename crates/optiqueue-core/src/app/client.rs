//! OptimizerClient - facade over submission, polling and result reconciliation

use std::sync::Arc;

use tracing::info;

use super::layout::parse_layout;
use super::reconciler::{Reconciler, ReconcilerHandle};
use super::status::{QueueCounts, TickReport};
use super::submission::Submitter;
use crate::config::ClientConfig;
use crate::domain::{Task, TaskId, WasteContainer};
use crate::error::{ServiceError, SubmitError};
use crate::ports::{IdGenerator, LayoutSource};
use crate::queue::SharedQueue;

/// Owns one task queue and everything that reads or writes it.
///
/// Built with [`ClientBuilder`](super::ClientBuilder).
pub struct OptimizerClient {
    pub(super) config: ClientConfig,
    pub(super) queue: SharedQueue,
    pub(super) submitter: Submitter,
    pub(super) reconciler: Arc<Reconciler>,
    pub(super) layout_source: Option<Arc<dyn LayoutSource>>,
    pub(super) ids: Arc<dyn IdGenerator>,
}

impl OptimizerClient {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a new optimization job; see [`Submitter::submit`].
    pub async fn submit(&self, label: Option<&str>) -> Result<TaskId, SubmitError> {
        self.submitter.submit(label).await
    }

    /// Run one reconciliation pass now.
    pub async fn tick(&self) -> TickReport {
        self.reconciler.tick().await
    }

    /// Start the periodic reconciliation loop at the configured interval.
    pub fn start_polling(&self) -> ReconcilerHandle {
        info!(interval_ms = self.config.poll_interval_ms, "starting reconciliation loop");
        ReconcilerHandle::spawn(self.reconciler.clone(), self.config.poll_interval())
    }

    /// Snapshot of every task in submission order.
    pub async fn tasks(&self) -> Vec<Task> {
        self.queue.lock().await.iter().cloned().collect()
    }

    pub async fn task(&self, task_id: &TaskId) -> Option<Task> {
        self.queue.lock().await.get(task_id).cloned()
    }

    pub async fn counts(&self) -> QueueCounts {
        self.queue.lock().await.counts_by_state()
    }

    /// True when no task is left pending.
    pub async fn is_settled(&self) -> bool {
        self.queue.lock().await.is_settled()
    }

    /// Fetch and parse the currently deployed container layout.
    pub async fn load_current_layout(&self) -> Result<Vec<WasteContainer>, ServiceError> {
        let source = self.layout_source.as_ref().ok_or_else(|| {
            ServiceError::Unavailable("no layout source configured".to_string())
        })?;
        let entries = source.fetch_current_layout().await?;
        let containers = parse_layout(&entries, self.ids.as_ref());
        info!(
            entries = entries.len(),
            containers = containers.len(),
            "current layout loaded"
        );
        Ok(containers)
    }
}
