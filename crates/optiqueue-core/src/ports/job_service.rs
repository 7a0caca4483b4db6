//! JobService port - interface to the remote optimization service
//!
//! The optimization itself is opaque: we can only start a job and ask how it
//! is doing. A second port, [`LayoutSource`], fetches the current container
//! dataset from the same backend.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::TaskId;
use crate::error::ServiceError;

/// Status of a remote job as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Not finished yet (including any state we do not recognise).
    Pending,

    /// Finished; carries the raw `[[lng, lat], ...]` payload.
    Success(serde_json::Value),

    /// Finished with an error; carries the service's diagnostic payload.
    Failure(serde_json::Value),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

#[async_trait]
pub trait JobService: Send + Sync {
    /// Start a new optimization job.
    async fn start_job(&self) -> Result<TaskId, ServiceError>;

    /// Query the current status of a job.
    async fn job_status(&self, task_id: &TaskId) -> Result<JobStatus, ServiceError>;
}

/// Source of the container dataset that seeds the current layout.
///
/// Each entry is a JSON-encoded string and is parsed independently by the
/// caller.
#[async_trait]
pub trait LayoutSource: Send + Sync {
    async fn fetch_current_layout(&self) -> Result<Vec<String>, ServiceError>;
}

/// Body of a start-job response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StartJobResponse {
    Accepted { task_id: String },
    Rejected { error: String },
}

impl StartJobResponse {
    pub fn into_result(self) -> Result<TaskId, ServiceError> {
        match self {
            StartJobResponse::Accepted { task_id } => Ok(TaskId::new(task_id)),
            StartJobResponse::Rejected { error } => Err(ServiceError::Rejected(error)),
        }
    }
}

/// State names reported by the service's task backend.
///
/// Only `SUCCESS` and `FAILURE` are terminal for us; everything else is
/// treated as still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteState {
    Pending,
    Received,
    Started,
    Retry,
    Success,
    Failure,
    #[serde(other)]
    Unknown,
}

/// Body of a status response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobStatusResponse {
    pub state: RemoteState,
    #[serde(default)]
    pub result: serde_json::Value,
}

impl From<JobStatusResponse> for JobStatus {
    fn from(resp: JobStatusResponse) -> Self {
        match resp.state {
            RemoteState::Success => JobStatus::Success(resp.result),
            RemoteState::Failure => JobStatus::Failure(resp.result),
            _ => JobStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn start_response_accepted() {
        let resp: StartJobResponse = serde_json::from_str(r#"{"task_id":"abc"}"#).unwrap();
        assert_eq!(resp.into_result().unwrap(), TaskId::new("abc"));
    }

    #[test]
    fn start_response_rejected() {
        let resp: StartJobResponse = serde_json::from_str(r#"{"error":"broker down"}"#).unwrap();
        let err = resp.into_result().unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(msg) if msg == "broker down"));
    }

    #[test]
    fn success_status_keeps_payload() {
        let resp: JobStatusResponse =
            serde_json::from_str(r#"{"state":"SUCCESS","result":[[1.5,40.2]]}"#).unwrap();
        assert_eq!(
            JobStatus::from(resp),
            JobStatus::Success(serde_json::json!([[1.5, 40.2]]))
        );
    }

    #[rstest]
    #[case::pending(r#"{"state":"PENDING","result":null}"#)]
    #[case::started(r#"{"state":"STARTED"}"#)]
    #[case::retry(r#"{"state":"RETRY","result":"boom"}"#)]
    #[case::unknown(r#"{"state":"PROGRESS","result":{"pct":40}}"#)]
    fn non_terminal_states_map_to_pending(#[case] body: &str) {
        let resp: JobStatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(JobStatus::from(resp), JobStatus::Pending);
    }

    #[test]
    fn failure_without_result_has_null_diagnostic() {
        let resp: JobStatusResponse = serde_json::from_str(r#"{"state":"FAILURE"}"#).unwrap();
        assert_eq!(
            JobStatus::from(resp),
            JobStatus::Failure(serde_json::Value::Null)
        );
    }
}
