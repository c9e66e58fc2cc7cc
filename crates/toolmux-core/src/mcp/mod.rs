//! MCP (Model Context Protocol) transport
//!
//! Uses the official rmcp SDK. `McpConnector` plugs real servers into the
//! connection manager.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolmux_core::mcp::McpClient;
//!
//! let client = McpClient::connect_http("http://localhost:5027/mcp", logger).await?;
//! let tools = client.list_tools().await?;
//! let result = client.call_tool("now", json!({})).await?;
//! client.close().await?;
//! ```

mod client;

pub use client::{McpClient, McpConnector, McpError, McpResult};
