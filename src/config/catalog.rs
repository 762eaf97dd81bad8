//! Tool catalog loading

use crate::error::{BridgeError, Result};
use crate::tools::ToolDescriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../../config/tools.json");

/// A `{"tools": [...]}` document of tool descriptors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCatalog {
    pub tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| BridgeError::config(format!("Failed to parse tool catalog: {}", e)))
    }

    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!(
                "Failed to read tool catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&json)
    }

    /// Load from `path` when given, otherwise the built-in catalog
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                tracing::info!("Loading tool catalog from {}", path.display());
                Self::from_path(path)
            }
            None => Self::builtin(),
        }
    }
}
