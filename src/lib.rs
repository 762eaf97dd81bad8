//! Taskbridge - Configuration-driven tool dispatch for remote task APIs
//!
//! Each configured tool validates caller input against its declarative
//! schema, maps it into a task submission, and then follows the task's
//! server-sent event stream until it finishes or fails.

mod config;
pub mod core;
pub mod error;
pub mod tools;
pub mod utils;

pub mod cli;

pub use config::{Credentials, Settings, ToolCatalog};
pub use core::client::{TaskBackend, TaskClient};
pub use core::mcp::MCPServer;
pub use core::task::{TaskStatus, TaskStatusRecord};
pub use error::{BridgeError, Result};
pub use tools::executor::ToolExecutor;
pub use tools::registry::ToolRegistry;
pub use tools::{ToolDescriptor, ToolInvocationResult};

use std::sync::Arc;

/// Load the tool catalog named by `settings` into a validated registry
pub fn load_registry(settings: &Settings) -> Result<ToolRegistry> {
    let catalog = ToolCatalog::load(settings.tools.path.as_deref())?;
    ToolRegistry::from_descriptors(catalog.tools)
}

/// Wire a registry to the remote task API described by `credentials`
pub fn build_executor(registry: Arc<ToolRegistry>, credentials: &Credentials) -> ToolExecutor {
    let client = TaskClient::new(&credentials.server_host, &credentials.api_key);
    tracing::info!("Task API host: {}", client.host());
    ToolExecutor::new(registry, Arc::new(client))
}
