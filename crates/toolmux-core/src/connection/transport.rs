//! Transport seam between the lifecycle manager and concrete tool servers

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ServerDescriptor;
use crate::mcp::McpResult;
use crate::types::ManifestEntry;

/// Text output of one tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    /// The server executed the call but reported failure
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// One open session with a tool server
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Enumerate the server's tools
    async fn list_tools(&self) -> McpResult<Vec<ManifestEntry>>;

    /// Invoke a tool and wait for its output
    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput>;

    /// Terminate the session
    async fn close(self: Box<Self>) -> McpResult<()>;
}

/// Opens sessions to tool servers
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, server: &ServerDescriptor) -> McpResult<Box<dyn ToolSession>>;
}
