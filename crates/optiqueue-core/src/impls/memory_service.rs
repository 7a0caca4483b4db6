//! InMemoryJobService - scripted job service for development and tests
//!
//! Job ids are issued as `job-1`, `job-2`, ... Status answers are scripted
//! per task; when a task has no script left it answers `PENDING`, or, if
//! auto-completion is configured, `SUCCESS` once it has been polled enough.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::TaskId;
use crate::error::ServiceError;
use crate::ports::{JobService, JobStatus, LayoutSource};

/// A scripted answer to a status query.
#[derive(Debug, Clone)]
enum Scripted {
    Status(JobStatus),
    Error(String),
}

#[derive(Debug, Clone)]
struct AutoComplete {
    after_polls: usize,
    result: serde_json::Value,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    start_failures: VecDeque<String>,
    forced_ids: VecDeque<TaskId>,
    scripts: HashMap<TaskId, VecDeque<Scripted>>,
    delays: HashMap<TaskId, Duration>,
    status_calls: HashMap<TaskId, usize>,
    start_calls: usize,
    auto_complete: Option<AutoComplete>,
    layout: Vec<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryJobService {
    state: Mutex<State>,
}

impl InMemoryJobService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every job answers `SUCCESS` with `result` from its `after_polls`-th
    /// status query on, unless a script says otherwise.
    pub fn with_auto_complete(self, after_polls: usize, result: serde_json::Value) -> Self {
        self.lock().auto_complete = Some(AutoComplete {
            after_polls: after_polls.max(1),
            result,
        });
        self
    }

    /// Entries returned by [`LayoutSource::fetch_current_layout`].
    pub fn with_layout(self, entries: Vec<String>) -> Self {
        self.lock().layout = entries;
        self
    }

    /// The next `start_job` answers `{ "error": message }`.
    pub fn fail_next_start(&self, message: impl Into<String>) {
        self.lock().start_failures.push_back(message.into());
    }

    /// The next `start_job` issues `task_id` instead of a fresh id.
    pub fn reuse_next_id(&self, task_id: TaskId) {
        self.lock().forced_ids.push_back(task_id);
    }

    /// Queue a status answer for `task_id`.
    pub fn push_status(&self, task_id: &TaskId, status: JobStatus) {
        self.script(task_id, Scripted::Status(status));
    }

    /// Queue a transport error for `task_id`.
    pub fn push_error(&self, task_id: &TaskId, message: impl Into<String>) {
        self.script(task_id, Scripted::Error(message.into()));
    }

    /// Delay every status answer for `task_id`.
    pub fn set_delay(&self, task_id: &TaskId, delay: Duration) {
        self.lock().delays.insert(task_id.clone(), delay);
    }

    pub fn status_calls(&self, task_id: &TaskId) -> usize {
        self.lock().status_calls.get(task_id).copied().unwrap_or(0)
    }

    pub fn total_status_calls(&self) -> usize {
        self.lock().status_calls.values().sum()
    }

    pub fn start_calls(&self) -> usize {
        self.lock().start_calls
    }

    fn script(&self, task_id: &TaskId, answer: Scripted) {
        self.lock()
            .scripts
            .entry(task_id.clone())
            .or_default()
            .push_back(answer);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding this lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl JobService for InMemoryJobService {
    async fn start_job(&self) -> Result<TaskId, ServiceError> {
        let mut state = self.lock();
        state.start_calls += 1;
        if let Some(message) = state.start_failures.pop_front() {
            return Err(ServiceError::Rejected(message));
        }
        if let Some(task_id) = state.forced_ids.pop_front() {
            return Ok(task_id);
        }
        state.next_id += 1;
        Ok(TaskId::new(format!("job-{}", state.next_id)))
    }

    async fn job_status(&self, task_id: &TaskId) -> Result<JobStatus, ServiceError> {
        let (answer, delay) = {
            let mut state = self.lock();
            let calls = {
                let calls = state.status_calls.entry(task_id.clone()).or_insert(0);
                *calls += 1;
                *calls
            };
            let scripted = state
                .scripts
                .get_mut(task_id)
                .and_then(|script| script.pop_front());
            let answer = match (scripted, &state.auto_complete) {
                (Some(answer), _) => answer,
                (None, Some(auto)) if calls >= auto.after_polls => {
                    Scripted::Status(JobStatus::Success(auto.result.clone()))
                }
                (None, _) => Scripted::Status(JobStatus::Pending),
            };
            (answer, state.delays.get(task_id).copied())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match answer {
            Scripted::Status(status) => Ok(status),
            Scripted::Error(message) => Err(ServiceError::Unavailable(message)),
        }
    }
}

#[async_trait]
impl LayoutSource for InMemoryJobService {
    async fn fetch_current_layout(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.lock().layout.clone())
    }
}
