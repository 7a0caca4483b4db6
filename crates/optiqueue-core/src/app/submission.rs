//! Submission - ジョブの投入
//!
//! # フロー
//! 1. JobService::start_job() で task_id を取得（ロックは持たない）
//! 2. TaskQueue に PENDING の Task を追加
//! 3. PresentationSink::on_task_created() を通知

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{Task, TaskId};
use crate::error::SubmitError;
use crate::ports::{Clock, JobService, PresentationSink};
use crate::queue::SharedQueue;

#[derive(Clone)]
pub struct Submitter {
    queue: SharedQueue,
    service: Arc<dyn JobService>,
    sink: Arc<dyn PresentationSink>,
    clock: Arc<dyn Clock>,
}

impl Submitter {
    pub fn new(
        queue: SharedQueue,
        service: Arc<dyn JobService>,
        sink: Arc<dyn PresentationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            service,
            sink,
            clock,
        }
    }

    /// ジョブを開始し、キューで追跡する
    ///
    /// - label が空または未指定なら `"Layout {n}"`（n はキュー内の 1 始まりの位置）
    /// - エラー時はキューに何も追加せず、イベントも発火しない
    pub async fn submit(&self, label: Option<&str>) -> Result<TaskId, SubmitError> {
        let task_id = match self.service.start_job().await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "job submission failed");
                return Err(e.into());
            }
        };

        let mut queue = self.queue.lock().await;
        let label = match label.map(str::trim) {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => format!("Layout {}", queue.len() + 1),
        };

        let task = queue.push(Task::new(task_id.clone(), label, self.clock.now()))?;
        info!(task_id = %task.id(), label = task.label(), "task added to queue");
        self.sink.on_task_created(task);

        Ok(task_id)
    }
}
