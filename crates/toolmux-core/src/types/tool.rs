//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Tool definition handed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl Tool {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: None,
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// One raw entry of a server's tool manifest, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Option<Value>,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// Why a manifest entry was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolSpecError {
    #[error("tool name is empty")]
    EmptyName,

    #[error("tool name '{0}' contains whitespace or control characters")]
    InvalidName(String),

    #[error("parameter schema of '{0}' is not a JSON object")]
    InvalidSchema(String),

    #[error("tool '{0}' is declared more than once")]
    Duplicate(String),
}

/// A validated tool advertised by one server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpecification {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "parameters", skip_serializing_if = "Option::is_none")]
    pub parameter_schema: Option<Value>,
}

impl TryFrom<ManifestEntry> for ToolSpecification {
    type Error = ToolSpecError;

    fn try_from(entry: ManifestEntry) -> Result<Self, Self::Error> {
        if entry.name.is_empty() {
            return Err(ToolSpecError::EmptyName);
        }
        if entry.name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ToolSpecError::InvalidName(entry.name));
        }
        // A null schema is treated like an absent one
        let parameter_schema = match entry.input_schema {
            None | Some(Value::Null) => None,
            Some(schema @ Value::Object(_)) => Some(schema),
            Some(_) => return Err(ToolSpecError::InvalidSchema(entry.name)),
        };
        Ok(Self {
            name: entry.name,
            description: entry.description.filter(|d| !d.is_empty()),
            parameter_schema,
        })
    }
}

impl ToolSpecification {
    /// Validate a whole manifest; any bad entry rejects all of it
    pub fn from_manifest(entries: Vec<ManifestEntry>) -> Result<Vec<Self>, ToolSpecError> {
        let mut specs: Vec<Self> = Vec::with_capacity(entries.len());
        for entry in entries {
            let spec = Self::try_from(entry)?;
            if specs.iter().any(|s| s.name == spec.name) {
                return Err(ToolSpecError::Duplicate(spec.name));
            }
            specs.push(spec);
        }
        Ok(specs)
    }
}

impl From<&ToolSpecification> for Tool {
    fn from(spec: &ToolSpecification) -> Self {
        Tool {
            name: spec.name.clone(),
            description: spec.description.clone().unwrap_or_default(),
            input_schema: spec.parameter_schema.clone(),
        }
    }
}

/// Tool call from the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Input arguments for the tool
    pub input: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Get an input argument as a string
    pub fn get_arg_str(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(|v| v.as_str())
    }
}

/// Tool result to send back to LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// The result content
    pub content: String,
    /// Whether this result represents an error
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: error.into(),
            is_error: true,
        }
    }
}
