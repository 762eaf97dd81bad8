//! Tool Executor
//!
//! Information Hiding:
//! - Validation, mapping, submission and monitoring composed behind `execute`
//! - Every failure converted into a caller-facing result at this boundary

use super::registry::{CompiledTool, ToolRegistry};
use super::{ToolDefinition, ToolInvocationResult};
use crate::core::client::TaskBackend;
use crate::error::{BridgeError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Runs tool invocations end to end against a task backend
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    backend: Arc<dyn TaskBackend>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, backend: Arc<dyn TaskBackend>) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions().await
    }

    /// Execute the named tool with raw caller input. Never fails: errors are
    /// rendered as `"<description> failed: <message>"`.
    pub async fn execute(&self, name: &str, input: Value) -> ToolInvocationResult {
        let Some(tool) = self.registry.get(name).await else {
            tracing::error!("Tool not found: {}", name);
            return ToolInvocationResult::failure(name, format!("Unknown tool: {}", name));
        };

        tracing::info!("{} tool execution started", tool.name());

        let validated = match tool.validator.validate(&input) {
            Ok(validated) => validated,
            Err(e) => {
                tracing::error!("{} input validation failed: {}", tool.name(), e);
                return ToolInvocationResult::failure(&tool.descriptor.description, e);
            }
        };

        match self.execute_task(&tool, validated).await {
            Ok(message) => {
                tracing::info!("{} tool execution completed successfully", tool.name());
                ToolInvocationResult::success(message)
            }
            Err(e) => {
                tracing::error!("{} process failed: {}", tool.name(), e);
                ToolInvocationResult::failure(&tool.descriptor.description, e)
            }
        }
    }

    /// Map, submit, and wait for completion of already-validated input
    pub async fn execute_task(
        &self,
        tool: &CompiledTool,
        validated: Map<String, Value>,
    ) -> Result<String> {
        let payload = tool.mapper.build(&validated);
        let submitted = self
            .backend
            .submit(&tool.descriptor.api_endpoint, &payload)
            .await?;

        if submitted.completed_immediately() {
            tracing::info!(task_id = %submitted.task_id, "Task completed immediately");
            return Ok(submitted.success_message());
        }

        if submitted.task_id.is_empty() {
            return Err(BridgeError::ApiRequest {
                status: None,
                body: "task response did not include a taskId".to_string(),
            });
        }

        let finished = self.backend.await_completion(&submitted.task_id).await?;
        Ok(finished.success_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{TaskStatus, TaskStatusRecord};
    use crate::tools::fixtures;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted backend recording every payload it receives
    struct MockBackend {
        submitted: TaskStatusRecord,
        outcome: fn() -> Result<TaskStatusRecord>,
        payloads: Mutex<Vec<Map<String, Value>>>,
        subscriptions: Mutex<Vec<String>>,
    }

    impl MockBackend {
        fn new(submitted: Value, outcome: fn() -> Result<TaskStatusRecord>) -> Arc<Self> {
            Arc::new(Self {
                submitted: serde_json::from_value(submitted).unwrap(),
                outcome,
                payloads: Mutex::new(Vec::new()),
                subscriptions: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TaskBackend for MockBackend {
        async fn submit(
            &self,
            _endpoint: &str,
            payload: &Map<String, Value>,
        ) -> Result<TaskStatusRecord> {
            self.payloads.lock().unwrap().push(payload.clone());
            Ok(self.submitted.clone())
        }

        async fn await_completion(&self, task_id: &str) -> Result<TaskStatusRecord> {
            self.subscriptions.lock().unwrap().push(task_id.to_string());
            (self.outcome)()
        }
    }

    fn finished() -> Result<TaskStatusRecord> {
        Ok(TaskStatusRecord {
            task_id: String::new(),
            status: TaskStatus::Finished,
            result_url: Some("https://x/out.png".to_string()),
            mime_type: Some("image/png".to_string()),
            thumbnail_url: None,
            duration_seconds: None,
        })
    }

    fn failed() -> Result<TaskStatusRecord> {
        Err(BridgeError::TaskFailed)
    }

    fn executor(backend: Arc<MockBackend>) -> ToolExecutor {
        let registry =
            ToolRegistry::from_descriptors(vec![fixtures::remove_bg(), fixtures::upscaler()])
                .unwrap();
        ToolExecutor::new(Arc::new(registry), backend)
    }

    #[tokio::test]
    async fn test_immediate_completion_skips_stream() {
        let backend = MockBackend::new(
            json!({"taskId": "t1", "status": "FINISHED", "imageUrl": "https://x/y.png"}),
            failed,
        );
        let result = executor(backend.clone())
            .execute("remove_bg", json!({"image_url": "https://x/in.png"}))
            .await;

        assert!(!result.is_error);
        assert!(result.text().contains("Task completed: https://x/y.png"));
        assert!(backend.subscriptions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_task_is_monitored() {
        let backend = MockBackend::new(json!({"taskId": "t2", "status": "PROCESSING"}), finished);
        let result = executor(backend.clone())
            .execute("image_upscaler", json!({"image_url": "https://x/in.png"}))
            .await;

        assert_eq!(result.text(), "Task completed: https://x/out.png\nMime Type: image/png");
        assert_eq!(*backend.subscriptions.lock().unwrap(), vec!["t2"]);

        let payloads = backend.payloads.lock().unwrap();
        assert_eq!(payloads[0]["scale"], json!(2));
        assert_eq!(payloads[0]["source"], json!("mcp"));
    }

    #[tokio::test]
    async fn test_failed_task_renders_error() {
        let backend = MockBackend::new(json!({"taskId": "t2", "status": "PROCESSING"}), failed);
        let result = executor(backend)
            .execute("remove_bg", json!({"image_url": "https://x/in.png"}))
            .await;

        assert!(result.is_error);
        assert_eq!(result.text(), "Remove image background failed: Task failed");
    }

    #[tokio::test]
    async fn test_invalid_input_never_submits() {
        let backend = MockBackend::new(json!({"taskId": "t1", "status": "WAITING"}), finished);
        let result = executor(backend.clone())
            .execute("remove_bg", json!({"image_url": "not-a-url"}))
            .await;

        assert!(result.is_error);
        assert_eq!(
            result.text(),
            "Remove image background failed: A valid image URL is required"
        );
        assert!(backend.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_task_id_is_an_api_error() {
        let backend = MockBackend::new(json!({"status": "WAITING"}), finished);
        let result = executor(backend.clone())
            .execute("remove_bg", json!({"image_url": "https://x/in.png"}))
            .await;

        assert!(result.is_error);
        assert!(result.text().contains("taskId"));
        assert!(backend.subscriptions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let backend = MockBackend::new(json!({"taskId": "t1", "status": "WAITING"}), finished);
        let result = executor(backend).execute("nope", json!({})).await;

        assert!(result.is_error);
        assert!(result.text().contains("Unknown tool: nope"));
    }
}
