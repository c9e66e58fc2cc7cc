//! MCP client using the official rmcp SDK
//!
//! Connects to tool servers over the streamable HTTP (event-stream) transport.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation, RawContent, Tool},
    service::RunningService,
    RoleClient,
};
use serde_json::Value;
use thiserror::Error;

use crate::config::ServerDescriptor;
use crate::connection::{Connector, ToolOutput, ToolSession};
use crate::logging::Logger;
use crate::types::ManifestEntry;

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type McpResult<T> = Result<T, McpError>;

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolmux".to_string(),
            title: Some("toolmux".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// MCP client for one tool server
pub struct McpClient {
    /// The underlying rmcp running service
    client: RunningService<RoleClient, ClientInfo>,
    /// Endpoint, for log lines
    url: String,
    logger: Arc<dyn Logger>,
}

impl McpClient {
    /// Connect to an MCP server over HTTP (Streamable HTTP transport)
    pub async fn connect_http(url: &str, logger: Arc<dyn Logger>) -> McpResult<Self> {
        use rmcp::transport::StreamableHttpClientTransport;

        logger.debug(&format!("[McpClient] Connecting to {}", url));

        let transport = StreamableHttpClientTransport::from_uri(url);

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        logger.debug(&format!("[McpClient] {} initialized", url));

        Ok(Self {
            client,
            url: url.to_string(),
            logger,
        })
    }

    /// List all available tools
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let result = self
            .client
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger.debug(&format!(
            "[McpClient] {} listed {} tools",
            self.url,
            result.tools.len()
        ));

        Ok(result.tools)
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<CallToolResult> {
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        self.client
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))
    }

    /// Get server info
    pub fn server_info(&self) -> Option<&Implementation> {
        self.client.peer_info().map(|info| &info.server_info)
    }

    /// Close the connection
    pub async fn close(self) -> McpResult<()> {
        self.logger.debug(&format!("[McpClient] Closing {}", self.url));
        self.client
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }
}

/// Convert an rmcp tool into an unvalidated manifest entry
fn manifest_entry(tool: Tool) -> ManifestEntry {
    ManifestEntry {
        name: tool.name.to_string(),
        description: tool.description.map(|s| s.to_string()),
        // input_schema is Arc<JsonObject>
        input_schema: serde_json::to_value(tool.input_schema.as_ref()).ok(),
    }
}

/// Flatten the text parts of a tool result
fn tool_output(result: CallToolResult) -> ToolOutput {
    let content = result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    ToolOutput {
        content,
        is_error: result.is_error.unwrap_or(false),
    }
}

#[async_trait]
impl ToolSession for McpClient {
    async fn list_tools(&self) -> McpResult<Vec<ManifestEntry>> {
        let tools = McpClient::list_tools(self).await?;
        Ok(tools.into_iter().map(manifest_entry).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
        McpClient::call_tool(self, name, arguments).await.map(tool_output)
    }

    async fn close(self: Box<Self>) -> McpResult<()> {
        McpClient::close(*self).await
    }
}

/// Connector for real MCP servers
#[derive(Clone)]
pub struct McpConnector {
    logger: Arc<dyn Logger>,
}

impl McpConnector {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl Connector for McpConnector {
    async fn connect(&self, server: &ServerDescriptor) -> McpResult<Box<dyn ToolSession>> {
        let client = McpClient::connect_http(&server.endpoint, Arc::clone(&self.logger)).await?;
        if let Some(info) = client.server_info() {
            self.logger.debug(&format!(
                "[McpConnector] {} is {} {}",
                server.id, info.name, info.version
            ));
        }
        Ok(Box::new(client))
    }
}
