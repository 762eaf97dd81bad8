//! Request Mapper
//!
//! Turns validated caller input into the outbound task payload. Both catalog
//! mapping shapes are normalized into `MappingRule` when the mapper is built.

use super::{MappingEntry, MappingSource, ToolDescriptor};
use crate::error::{BridgeError, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Field added to every payload to identify this bridge as the origin
pub const PROVENANCE_FIELD: &str = "source";
pub const PROVENANCE_VALUE: &str = "mcp";

#[derive(Debug, Clone, PartialEq)]
pub enum MappingRule {
    /// Copy the named input field, omitted when the field is absent
    FromInput(String),
    /// Copy the named input field, or send the name itself when absent
    FromInputOr(String),
    Static(Value),
}

impl MappingRule {
    fn normalize(descriptor: &ToolDescriptor, target: &str, entry: &MappingEntry) -> Result<Self> {
        match entry {
            MappingEntry::Field(name) if descriptor.declares_field(name) => {
                Ok(MappingRule::FromInputOr(name.clone()))
            }
            MappingEntry::Field(literal) => Ok(MappingRule::Static(Value::String(literal.clone()))),
            MappingEntry::Sourced {
                source: MappingSource::Input,
                value,
            } => value
                .as_str()
                .map(|name| MappingRule::FromInput(name.to_string()))
                .ok_or_else(|| {
                    BridgeError::config(format!(
                        "Input mapping for {} in tool {} must name a field",
                        target, descriptor.name
                    ))
                }),
            MappingEntry::Sourced {
                source: MappingSource::Static,
                value,
            } => Ok(MappingRule::Static(value.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestMapper {
    rules: Vec<(String, MappingRule)>,
    defaults: IndexMap<String, Value>,
}

impl RequestMapper {
    pub fn compile(descriptor: &ToolDescriptor) -> Result<Self> {
        let rules = descriptor
            .request_body_mapping
            .iter()
            .map(|(target, entry)| {
                MappingRule::normalize(descriptor, target, entry).map(|rule| (target.clone(), rule))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            defaults: descriptor.default_values.clone(),
        })
    }

    pub fn rules(&self) -> &[(String, MappingRule)] {
        &self.rules
    }

    /// Build the outbound payload: defaults first, then mapping rules in
    /// declaration order, then the provenance field.
    pub fn build(&self, validated: &Map<String, Value>) -> Map<String, Value> {
        let mut working = validated.clone();
        for (key, default) in &self.defaults {
            if !working.contains_key(key) {
                working.insert(key.clone(), default.clone());
            }
        }

        let mut body = Map::new();
        for (target, rule) in &self.rules {
            match rule {
                MappingRule::FromInput(field) => {
                    if let Some(value) = working.get(field) {
                        body.insert(target.clone(), value.clone());
                    }
                }
                MappingRule::FromInputOr(field) => {
                    let value = working
                        .get(field)
                        .cloned()
                        .unwrap_or_else(|| Value::String(field.clone()));
                    body.insert(target.clone(), value);
                }
                MappingRule::Static(value) => {
                    body.insert(target.clone(), value.clone());
                }
            }
        }

        body.insert(
            PROVENANCE_FIELD.to_string(),
            Value::String(PROVENANCE_VALUE.to_string()),
        );
        body
    }
}

pub fn build_request_body(
    descriptor: &ToolDescriptor,
    validated: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    Ok(RequestMapper::compile(descriptor)?.build(validated))
}
