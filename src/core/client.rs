//! Task Submitter
//!
//! Information Hiding:
//! - HTTP request construction and auth headers hidden
//! - Response normalization into `TaskStatusRecord` hidden
//! - Stream subscription handed straight to `TaskMonitor`

use crate::core::sse::TaskMonitor;
use crate::core::task::TaskStatusRecord;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde_json::{Map, Value};

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_SSE: &str = "text/event-stream";
const UNREADABLE_BODY: &str = "Unable to read error response";

/// Remote task API seen by the executor
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Submit a payload to `endpoint` and return the immediate task status
    async fn submit(&self, endpoint: &str, payload: &Map<String, Value>) -> Result<TaskStatusRecord>;

    /// Subscribe to the task's event stream and wait for a terminal status
    async fn await_completion(&self, task_id: &str) -> Result<TaskStatusRecord>;
}

/// Leave explicit `http://`/`https://` URLs alone, otherwise default to https
pub fn ensure_https_prefix(url: &str) -> String {
    if url.starts_with("https://") || url.starts_with("http://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// HTTP client for the remote task API
#[derive(Clone)]
pub struct TaskClient {
    client: Client,
    host: String,
    api_key: String,
}

impl TaskClient {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        ensure_https_prefix(&format!("{}{}", self.host, path))
    }

    fn authorization(&self) -> String {
        format!("KEY {}", self.api_key)
    }

    async fn error_body(response: Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|_| UNREADABLE_BODY.to_string())
    }
}

#[async_trait]
impl TaskBackend for TaskClient {
    async fn submit(&self, endpoint: &str, payload: &Map<String, Value>) -> Result<TaskStatusRecord> {
        let url = self.url(endpoint);
        tracing::info!("Submitting task to {}", url);
        tracing::debug!("Request body: {}", serde_json::Value::Object(payload.clone()));

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, ACCEPT_JSON)
            .header(CONTENT_TYPE, ACCEPT_JSON)
            .header(AUTHORIZATION, self.authorization())
            .json(payload)
            .send()
            .await
            .map_err(|e| BridgeError::ApiRequest {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::error!("API request failed: {} {}", status, body);
            return Err(BridgeError::ApiRequest {
                status: Some(status.as_u16()),
                body,
            });
        }

        let text = response.text().await.map_err(|e| BridgeError::ApiRequest {
            status: Some(status.as_u16()),
            body: e.to_string(),
        })?;
        let record: TaskStatusRecord =
            serde_json::from_str(&text).map_err(|e| BridgeError::ApiRequest {
                status: None,
                body: format!("invalid task response ({}): {}", e, text),
            })?;

        tracing::info!(task_id = %record.task_id, status = ?record.status, "Task submitted successfully");
        Ok(record)
    }

    async fn await_completion(&self, task_id: &str) -> Result<TaskStatusRecord> {
        let url = self.url(&format!("/api/task/{}/sse", task_id));
        tracing::info!(task_id, "Starting SSE connection to {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, ACCEPT_SSE)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| BridgeError::StreamConnection {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::error!("SSE connection failed: {} {}", status, body);
            return Err(BridgeError::StreamConnection {
                status: Some(status.as_u16()),
                body,
            });
        }

        TaskMonitor::new(task_id).run(response.bytes_stream()).await
    }
}
