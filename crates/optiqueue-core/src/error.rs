use thiserror::Error;

use crate::domain::{TaskId, TaskState};

/// Failure talking to the remote job service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an explicit `{ "error": ... }` payload.
    #[error("service rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Why a submission did not produce a task.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("could not start optimization job: {0}")]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Task queue bookkeeping errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("task {0} is already tracked")]
    DuplicateTask(TaskId),

    #[error("task {0} is not tracked")]
    UnknownTask(TaskId),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// A task refused a state change because it is already terminal.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("task {task_id} is already {state:?}")]
pub struct TransitionError {
    pub task_id: TaskId,
    pub state: TaskState,
}

/// A serialized task whose state and result disagree.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("task {task_id} is {state:?} but {reason}")]
pub struct InvalidTaskRecord {
    pub task_id: TaskId,
    pub state: TaskState,
    pub reason: &'static str,
}

/// A `SUCCESS` result payload that is not a list of `[lng, lat]` pairs.
#[derive(Debug, Error)]
#[error("result is not a list of coordinate pairs: {0}")]
pub struct MaterializeError(#[from] pub serde_json::Error);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
