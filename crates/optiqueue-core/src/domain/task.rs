//! Task record: one submitted optimization job and its eventual result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TaskId, TaskState, WasteContainer};
use crate::error::{InvalidTaskRecord, TransitionError};

/// What a terminal task carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaskResult {
    /// Materialized containers of the optimized layout.
    Layout(Vec<WasteContainer>),

    /// Opaque diagnostic payload reported by (or about) the failed job.
    Failure(serde_json::Value),
}

/// A tracked job.
///
/// Design:
/// - Fields are read-only from outside; state changes go through
///   [`Task::complete`] / [`Task::fail`].
/// - `result.is_some()` iff `state != Pending`, at every point in time.
///   Deserialization goes through [`RawTask`] and checks this too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTask")]
pub struct Task {
    id: TaskId,
    label: String,
    state: TaskState,
    result: Option<TaskResult>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, label: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            label: label.into(),
            state: TaskState::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn result(&self) -> Option<&TaskResult> {
        self.result.as_ref()
    }

    /// Containers of a successful layout, if any.
    pub fn containers(&self) -> Option<&[WasteContainer]> {
        match &self.result {
            Some(TaskResult::Layout(containers)) => Some(containers),
            _ => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Pending -> Success.
    pub fn complete(
        &mut self,
        containers: Vec<WasteContainer>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.ensure_pending()?;
        self.state = TaskState::Success;
        self.result = Some(TaskResult::Layout(containers));
        self.updated_at = now;
        Ok(())
    }

    /// Pending -> Failure.
    pub fn fail(
        &mut self,
        diagnostic: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.ensure_pending()?;
        self.state = TaskState::Failure;
        self.result = Some(TaskResult::Failure(diagnostic));
        self.updated_at = now;
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError {
                task_id: self.id.clone(),
                state: self.state,
            });
        }
        Ok(())
    }
}

/// Wire shape of a [`Task`] before the state/result check.
#[derive(Deserialize)]
struct RawTask {
    id: TaskId,
    label: String,
    state: TaskState,
    result: Option<TaskResult>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RawTask> for Task {
    type Error = InvalidTaskRecord;

    fn try_from(raw: RawTask) -> Result<Self, Self::Error> {
        let reason = match (raw.state, &raw.result) {
            (TaskState::Pending, None)
            | (TaskState::Success, Some(TaskResult::Layout(_)))
            | (TaskState::Failure, Some(TaskResult::Failure(_))) => None,
            (TaskState::Pending, Some(_)) => Some("carries a result"),
            (_, None) => Some("has no result"),
            _ => Some("carries a result of the wrong kind"),
        };
        if let Some(reason) = reason {
            return Err(InvalidTaskRecord {
                task_id: raw.id,
                state: raw.state,
                reason,
            });
        }
        Ok(Self {
            id: raw.id,
            label: raw.label,
            state: raw.state,
            result: raw.result,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LatLng;
    use chrono::TimeZone;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_task_is_pending_without_result() {
        let task = Task::new(TaskId::new("a"), "Layout 1", t0());
        assert_eq!(task.state(), TaskState::Pending);
        assert!(task.result().is_none());
        assert_eq!(task.created_at(), task.updated_at());
    }

    #[test]
    fn complete_attaches_layout() {
        let mut task = Task::new(TaskId::new("a"), "Layout 1", t0());
        let later = t0() + chrono::Duration::seconds(4);
        let containers = vec![WasteContainer::new("c1", LatLng::new(40.2, 1.5))];

        task.complete(containers.clone(), later).unwrap();

        assert_eq!(task.state(), TaskState::Success);
        assert_eq!(task.containers(), Some(containers.as_slice()));
        assert_eq!(task.updated_at(), later);
    }

    #[test]
    fn fail_attaches_diagnostic() {
        let mut task = Task::new(TaskId::new("a"), "Layout 1", t0());
        task.fail(serde_json::json!({"exc_type": "ValueError"}), t0())
            .unwrap();

        assert_eq!(task.state(), TaskState::Failure);
        assert!(matches!(task.result(), Some(TaskResult::Failure(_))));
        assert!(task.containers().is_none());
    }

    #[test]
    fn terminal_task_refuses_further_transitions() {
        let mut task = Task::new(TaskId::new("a"), "Layout 1", t0());
        task.fail(serde_json::Value::Null, t0()).unwrap();

        let err = task.complete(vec![], t0()).unwrap_err();
        assert_eq!(err.state, TaskState::Failure);
        assert_eq!(task.state(), TaskState::Failure);
        assert!(matches!(task.result(), Some(TaskResult::Failure(_))));

        assert!(task.fail(serde_json::Value::Null, t0()).is_err());
    }

    #[test]
    fn completed_task_survives_serde() {
        let mut task = Task::new(TaskId::new("a"), "Layout 1", t0());
        task.complete(vec![WasteContainer::new("c1", LatLng::new(40.2, 1.5))], t0())
            .unwrap();

        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }

    #[rstest]
    #[case::success_without_result(r#""state":"SUCCESS","result":null"#)]
    #[case::failure_without_result(r#""state":"FAILURE","result":null"#)]
    #[case::pending_with_result(r#""state":"PENDING","result":{"kind":"failure","value":"x"}"#)]
    #[case::success_with_failure(r#""state":"SUCCESS","result":{"kind":"failure","value":"x"}"#)]
    #[case::failure_with_layout(r#""state":"FAILURE","result":{"kind":"layout","value":[]}"#)]
    fn inconsistent_record_is_rejected(#[case] state_and_result: &str) {
        let json = format!(
            r#"{{"id":"x","label":"L",{state_and_result},"created_at":"2024-01-01T12:00:00Z","updated_at":"2024-01-01T12:00:00Z"}}"#
        );
        let err = serde_json::from_str::<Task>(&json).unwrap_err();
        assert!(err.to_string().contains("task x is"), "{err}");
    }

    #[test]
    fn event_with_inconsistent_task_is_rejected() {
        let json = r#"{"event":"task_completed","task":{"id":"x","label":"L","state":"SUCCESS","result":null,"created_at":"2024-01-01T12:00:00Z","updated_at":"2024-01-01T12:00:00Z"}}"#;
        assert!(serde_json::from_str::<crate::domain::DomainEvent>(json).is_err());
    }
}
