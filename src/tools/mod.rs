//! Tool System - Declarative tool descriptors and invocation results
//!
//! Information Hiding:
//! - Descriptor wire shape (camelCase JSON catalog) hidden behind typed structs
//! - Validation and request mapping compiled once per descriptor
//! - Registry synchronization hidden behind an async API

pub mod executor;
pub mod mapper;
pub mod registry;
pub mod validator;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identity and behavior contract for one remotely-backed tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Path appended to the configured server host
    pub api_endpoint: String,
    pub method_name: String,
    pub input_schema: InputSchema,
    pub request_body_mapping: IndexMap<String, MappingEntry>,
    #[serde(alias = "zodValidation")]
    pub field_validation: IndexMap<String, FieldValidation>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub default_values: IndexMap<String, Value>,
}

impl ToolDescriptor {
    pub fn is_required(&self, field: &str) -> bool {
        self.input_schema.required.iter().any(|r| r == field)
    }

    /// Every input field name the descriptor declares anywhere
    pub(crate) fn declares_field(&self, field: &str) -> bool {
        self.field_validation.contains_key(field)
            || self.input_schema.properties.contains_key(field)
            || self.default_values.contains_key(field)
    }

    /// Definition published to the protocol layer for tool listing
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type", default = "default_schema_type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

fn default_schema_type() -> String {
    "object".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

/// One entry of `requestBodyMapping`, in either of its two catalog shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingEntry {
    /// Bare string: an input field name, or a literal when no such field exists
    Field(String),
    Sourced { source: MappingSource, value: Value },
}

impl MappingEntry {
    /// The field name or literal this entry points at, when it is a string
    pub fn target(&self) -> Option<&str> {
        match self {
            MappingEntry::Field(name) => Some(name),
            MappingEntry::Sourced { value, .. } => value.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingSource {
    Input,
    Static,
}

/// Raw per-field validation descriptor as written in the catalog.
///
/// `kind` stays a string here so that unsupported kinds surface as a
/// configuration error when the descriptor is compiled, not as a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default)]
    pub error_message: String,
}

/// Tool metadata exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentSegment {
    Text { text: String },
}

/// Caller-facing outcome of exactly one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationResult {
    pub content: Vec<ContentSegment>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolInvocationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentSegment::Text {
                text: message.into(),
            }],
            is_error: false,
        }
    }

    /// Error result rendered as `"<tool description> failed: <message>"`
    pub fn failure(description: &str, error: impl fmt::Display) -> Self {
        Self {
            content: vec![ContentSegment::Text {
                text: format!("{} failed: {}", description, error),
            }],
            is_error: true,
        }
    }

    /// All text segments joined by newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|segment| match segment {
                ContentSegment::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::ToolDescriptor;
    use serde_json::json;

    /// Background-removal style descriptor used across module tests
    pub fn remove_bg() -> ToolDescriptor {
        serde_json::from_value(json!({
            "name": "remove_bg",
            "description": "Remove image background",
            "apiEndpoint": "/api/remove-bg",
            "methodName": "removeBg",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "image_url": {
                        "type": "string",
                        "description": "Image to process",
                        "validation": "url"
                    }
                },
                "required": ["image_url"]
            },
            "requestBodyMapping": {
                "imageUrl": "image_url",
                "source": "web"
            },
            "zodValidation": {
                "image_url": {
                    "type": "string",
                    "validation": "url",
                    "errorMessage": "A valid image URL is required"
                }
            }
        }))
        .unwrap()
    }

    /// Upscaler style descriptor with an enumeration field and a default
    pub fn upscaler() -> ToolDescriptor {
        serde_json::from_value(json!({
            "name": "image_upscaler",
            "description": "Upscale image",
            "apiEndpoint": "/api/image-upscaler",
            "methodName": "imageUpscaler",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "image_url": { "type": "string", "description": "Image to upscale" },
                    "scale": { "type": "number", "description": "Scale factor", "enum": [2, 4, 8, 16] }
                },
                "required": ["image_url"]
            },
            "requestBodyMapping": {
                "imageUrl": "image_url",
                "scale": "scale",
                "mode": { "source": "static", "value": "fast" }
            },
            "zodValidation": {
                "image_url": {
                    "type": "string",
                    "validation": "url",
                    "errorMessage": "A valid image URL is required"
                },
                "scale": {
                    "type": "union",
                    "values": [2, 4, 8, 16],
                    "errorMessage": "Scale must be 2, 4, 8 or 16"
                }
            },
            "defaultValues": { "scale": 2 }
        }))
        .unwrap()
    }
}
