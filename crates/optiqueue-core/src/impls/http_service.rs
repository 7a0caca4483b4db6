//! HttpJobService - talks to the backend over HTTP
//!
//! Endpoints (relative to `base_url`):
//! - `GET /start_task` → `{ "task_id": ... }` or `{ "error": ... }`
//! - `GET /task_status?task_id=...` → `{ "state": ..., "result": ... }`
//! - `GET /data/current` → `["<json>", ...]`

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::domain::TaskId;
use crate::error::ServiceError;
use crate::ports::{JobService, JobStatus, JobStatusResponse, LayoutSource, StartJobResponse};

#[derive(Debug, Clone)]
pub struct HttpJobService {
    base_url: String,
    client: Client,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpJobService {
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(&config.base_url, client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Decode a JSON body; on a non-2xx status prefer the `{error}` message.
    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ServiceError> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(&body) {
                return Err(ServiceError::Rejected(error));
            }
            return Err(ServiceError::Status(status.as_u16()));
        }

        serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn start_job(&self) -> Result<TaskId, ServiceError> {
        let resp = self.client.get(self.url("start_task")).send().await?;
        let body: StartJobResponse = Self::decode(resp).await?;
        let task_id = body.into_result()?;
        debug!(%task_id, "job started");
        Ok(task_id)
    }

    async fn job_status(&self, task_id: &TaskId) -> Result<JobStatus, ServiceError> {
        let resp = self
            .client
            .get(self.url("task_status"))
            .query(&[("task_id", task_id.as_str())])
            .send()
            .await?;
        let body: JobStatusResponse = Self::decode(resp).await?;
        Ok(body.into())
    }
}

#[async_trait]
impl LayoutSource for HttpJobService {
    async fn fetch_current_layout(&self) -> Result<Vec<String>, ServiceError> {
        let resp = self.client.get(self.url("data/current")).send().await?;
        Self::decode(resp).await
    }
}
