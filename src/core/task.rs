//! Normalized remote task state

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Waiting,
    Processing,
    Finished,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Failed)
    }
}

/// Snapshot of a remote task, parsed from a submission response or one
/// stream event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusRecord {
    // Stream events may carry only a status, or an explicit null id.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "thumbUrl", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TaskStatusRecord {
    /// Finished with a result URL, so no stream subscription is needed
    pub fn completed_immediately(&self) -> bool {
        self.status == TaskStatus::Finished && self.result_url.is_some()
    }

    /// Multi-line success text: the result URL, then duration, mime type and
    /// thumbnail when present
    pub fn success_message(&self) -> String {
        let mut message = format!(
            "Task completed: {}",
            self.result_url.as_deref().unwrap_or("(no result url)")
        );
        if let Some(duration) = self.duration_seconds {
            message.push_str(&format!("\nDuration: {}s", duration));
        }
        if let Some(mime_type) = &self.mime_type {
            message.push_str(&format!("\nMime Type: {}", mime_type));
        }
        if let Some(thumbnail) = &self.thumbnail_url {
            message.push_str(&format!("\nThumbnail: {}", thumbnail));
        }
        message
    }
}
