//! Tool Registry
//!
//! Information Hiding:
//! - Descriptor storage and lookup implementation hidden
//! - Descriptors validated and compiled before they become visible
//! - Entries are swapped whole, so readers never see a partial update

use super::mapper::RequestMapper;
use super::validator::InputValidator;
use super::{ToolDefinition, ToolDescriptor};
use crate::error::{BridgeError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A descriptor together with the validator and mapper compiled from it
#[derive(Debug)]
pub struct CompiledTool {
    pub descriptor: ToolDescriptor,
    pub validator: InputValidator,
    pub mapper: RequestMapper,
}

impl CompiledTool {
    pub fn compile(descriptor: ToolDescriptor) -> Result<Self> {
        validate_descriptor(&descriptor)?;
        let validator = InputValidator::compile(&descriptor)?;
        let mapper = RequestMapper::compile(&descriptor)?;
        Ok(Self {
            descriptor,
            validator,
            mapper,
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn definition(&self) -> ToolDefinition {
        self.descriptor.definition()
    }
}

/// Structural and cross-reference checks for one descriptor
pub fn validate_descriptor(descriptor: &ToolDescriptor) -> Result<()> {
    let required_fields = [
        ("name", descriptor.name.as_str()),
        ("description", descriptor.description.as_str()),
        ("apiEndpoint", descriptor.api_endpoint.as_str()),
        ("methodName", descriptor.method_name.as_str()),
    ];
    for (field, value) in required_fields {
        if value.trim().is_empty() {
            return Err(BridgeError::config(format!(
                "Tool config missing required field: {}",
                field
            )));
        }
    }
    if descriptor.request_body_mapping.is_empty() {
        return Err(BridgeError::config(format!(
            "Tool config missing required field: requestBodyMapping (tool {})",
            descriptor.name
        )));
    }

    for required in &descriptor.input_schema.required {
        if !descriptor.field_validation.contains_key(required) {
            return Err(BridgeError::config(format!(
                "Required field {} missing field validation in tool {}",
                required, descriptor.name
            )));
        }
    }

    for field in descriptor.default_values.keys() {
        if !descriptor.field_validation.contains_key(field) {
            return Err(BridgeError::config(format!(
                "Default value field {} missing field validation in tool {}",
                field, descriptor.name
            )));
        }

        let mapped = descriptor.request_body_mapping.contains_key(field)
            || descriptor
                .request_body_mapping
                .values()
                .any(|entry| entry.target() == Some(field.as_str()));
        if !mapped {
            return Err(BridgeError::config(format!(
                "Default value field {} not found in requestBodyMapping for tool {}",
                field, descriptor.name
            )));
        }
    }

    Ok(())
}

/// Registry of configured tools, shared by every invocation
pub struct ToolRegistry {
    tools: RwLock<Vec<Arc<CompiledTool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(Vec::new()),
        }
    }

    /// Build a registry from a startup catalog, failing on the first invalid
    /// or duplicate descriptor
    pub fn from_descriptors(descriptors: Vec<ToolDescriptor>) -> Result<Self> {
        let mut tools: Vec<Arc<CompiledTool>> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if tools.iter().any(|t| t.name() == descriptor.name) {
                return Err(BridgeError::config(format!(
                    "Tool {} already exists",
                    descriptor.name
                )));
            }
            tools.push(Arc::new(CompiledTool::compile(descriptor)?));
        }
        tracing::info!("Loaded {} tool descriptors", tools.len());
        Ok(Self {
            tools: RwLock::new(tools),
        })
    }

    /// Register a new tool
    pub async fn register(&self, descriptor: ToolDescriptor) -> Result<()> {
        let compiled = Arc::new(CompiledTool::compile(descriptor)?);
        let mut tools = self.tools.write().await;
        if tools.iter().any(|t| t.name() == compiled.name()) {
            return Err(BridgeError::config(format!(
                "Tool {} already exists",
                compiled.name()
            )));
        }
        tracing::info!("Registering tool: {}", compiled.name());
        tools.push(compiled);
        Ok(())
    }

    /// Replace the descriptor stored under `name`
    pub async fn update(&self, name: &str, descriptor: ToolDescriptor) -> Result<()> {
        let compiled = Arc::new(CompiledTool::compile(descriptor)?);
        let mut tools = self.tools.write().await;
        let index = tools
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| BridgeError::config(format!("Tool {} not found", name)))?;
        if compiled.name() != name && tools.iter().any(|t| t.name() == compiled.name()) {
            return Err(BridgeError::config(format!(
                "Tool {} already exists",
                compiled.name()
            )));
        }
        tracing::info!("Updating tool: {}", name);
        tools[index] = compiled;
        Ok(())
    }

    pub async fn remove(&self, name: &str) -> bool {
        let mut tools = self.tools.write().await;
        match tools.iter().position(|t| t.name() == name) {
            Some(index) => {
                tools.remove(index);
                tracing::info!("Removed tool: {}", name);
                true
            }
            None => {
                tracing::info!("Tool not found: {}", name);
                false
            }
        }
    }

    /// Get a tool by name
    pub async fn get(&self, name: &str) -> Option<Arc<CompiledTool>> {
        let tools = self.tools.read().await;
        tools.iter().find(|t| t.name() == name).cloned()
    }

    pub async fn has(&self, name: &str) -> bool {
        self.get(name).await.is_some()
    }

    /// All tools in registration order
    pub async fn all(&self) -> Vec<Arc<CompiledTool>> {
        self.tools.read().await.clone()
    }

    pub async fn names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().await;
        tools.iter().map(|t| t.definition()).collect()
    }

    /// Re-check every held descriptor, stopping at the first violation
    pub async fn validate_all(&self) -> Result<()> {
        let tools = self.tools.read().await;
        for tool in tools.iter() {
            validate_descriptor(&tool.descriptor)?;
            InputValidator::compile(&tool.descriptor)?;
            RequestMapper::compile(&tool.descriptor)?;
        }
        Ok(())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
