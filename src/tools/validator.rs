//! Validator Compiler
//!
//! Information Hiding:
//! - Catalog validation kinds compiled into a closed variant set up front
//! - Per-field checking and optional-field handling hidden behind `InputValidator`

use super::{FieldValidation, ToolDescriptor};
use crate::error::{BridgeError, Result};
use reqwest::Url;
use serde_json::{Map, Value};

/// Format constraints available to string fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Url,
}

impl TextFormat {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "url" => Some(TextFormat::Url),
            _ => None,
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            TextFormat::Url => Url::parse(value).is_ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text { format: Option<TextFormat> },
    Number,
    OneOf(Vec<Value>),
}

/// Executable validator for one input field
#[derive(Debug, Clone)]
pub struct FieldValidator {
    name: String,
    kind: FieldKind,
    required: bool,
    message: String,
}

impl FieldValidator {
    pub fn compile(name: &str, desc: &FieldValidation, required: bool) -> Result<Self> {
        let kind = match desc.kind.as_str() {
            "string" => {
                let format = match desc.validation.as_deref() {
                    None => None,
                    Some(format) => Some(TextFormat::parse(format).ok_or_else(|| {
                        BridgeError::config(format!(
                            "Unsupported string validation '{}' for field {}",
                            format, name
                        ))
                    })?),
                };
                FieldKind::Text { format }
            }
            "number" => FieldKind::Number,
            "union" | "enum" => match &desc.values {
                Some(values) if !values.is_empty() => FieldKind::OneOf(values.clone()),
                _ => {
                    return Err(BridgeError::config(format!(
                        "Union validation requires values for field {}",
                        name
                    )))
                }
            },
            other => {
                return Err(BridgeError::config(format!(
                    "Unsupported validation type '{}' for field {}",
                    other, name
                )))
            }
        };

        Ok(Self {
            name: name.to_string(),
            kind,
            required,
            message: desc.error_message.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Check a single value. `Ok(None)` means an optional field was not provided.
    pub fn check(&self, value: Option<&Value>) -> Result<Option<Value>> {
        let Some(value) = value else {
            if self.required {
                return Err(self.reject());
            }
            return Ok(None);
        };

        let accepted = match (&self.kind, value) {
            (FieldKind::Text { format }, Value::String(text)) => {
                format.map_or(true, |format| format.accepts(text))
            }
            (FieldKind::Number, Value::Number(_)) => true,
            (FieldKind::OneOf(literals), candidate) => {
                literals.iter().any(|literal| literal_eq(literal, candidate))
            }
            _ => false,
        };

        if accepted {
            Ok(Some(value.clone()))
        } else {
            Err(self.reject())
        }
    }

    fn reject(&self) -> BridgeError {
        let message = if self.message.is_empty() {
            format!("Invalid value for {}", self.name)
        } else {
            self.message.clone()
        };
        BridgeError::validation(&self.name, message)
    }
}

// Numbers compare by value so that `2` and `2.0` are the same literal.
fn literal_eq(literal: &Value, candidate: &Value) -> bool {
    match (literal, candidate) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => literal == candidate,
    }
}

/// Aggregated validator for one tool's input object
#[derive(Debug, Clone)]
pub struct InputValidator {
    fields: Vec<FieldValidator>,
}

impl InputValidator {
    pub fn compile(descriptor: &ToolDescriptor) -> Result<Self> {
        let fields = descriptor
            .field_validation
            .iter()
            .map(|(name, desc)| FieldValidator::compile(name, desc, descriptor.is_required(name)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldValidator] {
        &self.fields
    }

    /// Validate raw caller input, keeping only recognized fields.
    ///
    /// Fails on the first violating field in declaration order.
    pub fn validate(&self, raw: &Value) -> Result<Map<String, Value>> {
        let empty = Map::new();
        let object = match raw {
            Value::Object(object) => object,
            Value::Null => &empty,
            _ => {
                return Err(BridgeError::validation(
                    "",
                    "Tool input must be a JSON object",
                ))
            }
        };

        let mut validated = Map::new();
        for field in &self.fields {
            if let Some(value) = field.check(object.get(field.name()))? {
                validated.insert(field.name().to_string(), value);
            }
        }
        Ok(validated)
    }
}

/// Compile the descriptor's validators and apply them to `raw`
pub fn validate_input(descriptor: &ToolDescriptor, raw: &Value) -> Result<Map<String, Value>> {
    InputValidator::compile(descriptor)?.validate(raw)
}
