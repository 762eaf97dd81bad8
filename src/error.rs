//! Error taxonomy for tool dispatch and task monitoring

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors raised while loading tools or running a single invocation
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Malformed or cross-reference-violating tool descriptor
    #[error("Invalid tool configuration: {0}")]
    Config(String),

    /// Caller input failed a field's declared constraint
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("API request failed{}: {body}", status_suffix(.status))]
    ApiRequest { status: Option<u16>, body: String },

    #[error("SSE connection failed{}: {body}", status_suffix(.status))]
    StreamConnection { status: Option<u16>, body: String },

    #[error("Task failed")]
    TaskFailed,

    #[error("Task monitoring timed out")]
    TaskTimeout,
}

impl BridgeError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!("({})", code)).unwrap_or_default()
}
