//! Streaming types: model chunks in, response fragments out

use serde::{Deserialize, Serialize};
use super::tool::ToolCall;

/// Streaming chunk from an LLM response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Text content chunk
    Text {
        text: String,
    },
    /// Complete tool call
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolCall,
    },
    /// Partial tool call (for streaming tool arguments)
    ToolCallDelta {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(rename = "inputDelta", skip_serializing_if = "Option::is_none")]
        input_delta: Option<String>,
    },
}

impl StreamChunk {
    /// Create a text chunk
    pub fn text(text: impl Into<String>) -> Self {
        StreamChunk::Text { text: text.into() }
    }

    /// Create a tool call chunk
    pub fn tool_call(tool_call: ToolCall) -> Self {
        StreamChunk::ToolCall { tool_call }
    }

    /// Get the text content if this is a text chunk
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamChunk::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Get the tool call if this is a tool call chunk
    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            StreamChunk::ToolCall { tool_call } => Some(tool_call),
            _ => None,
        }
    }
}

/// Why an invocation loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model produced a turn without tool calls
    Stop,
    /// The configured step bound was reached
    MaxSteps,
}

/// One piece of the response streamed to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFragment {
    /// Model text, forwarded as soon as it is generated
    Text { text: String },
    /// The model asked for a tool
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolCall,
    },
    /// Outcome of a dispatched tool call
    ToolResult {
        #[serde(rename = "callId")]
        call_id: String,
        name: String,
        content: String,
        #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Terminal fragment of a successful request
    Finish { reason: FinishReason, steps: usize },
    /// Terminal fragment of a failed request
    Error { message: String },
}

impl ResponseFragment {
    pub fn text(text: impl Into<String>) -> Self {
        ResponseFragment::Text { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ResponseFragment::Error { message: message.into() }
    }

    /// Whether this fragment ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResponseFragment::Finish { .. } | ResponseFragment::Error { .. })
    }
}
