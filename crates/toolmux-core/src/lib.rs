//! toolmux core
//!
//! Multi-source tool aggregation for chat completions. For every chat
//! request the configured MCP tool servers are opened concurrently, their
//! manifests merged into one namespace, and a bounded tool-invocation loop
//! is driven against the model. Every connection opened for a request is
//! closed exactly once, whatever way the request ends.
//!
//! ## Flow
//!
//! ```text
//! ServerRegistry::list ─► ConnectionManager::open_scope ─► ToolAggregator::aggregate
//!                                                                │
//!        ResponseFragment stream ◄── InvocationLoop::run ◄───────┘
//!                                          │
//!                              RequestScope::close_all
//! ```
//!
//! ```rust,ignore
//! use toolmux_core::{ChatRequest, ChatService, ChatMessage, FileServerRegistry};
//! use toolmux_core::mcp::McpConnector;
//!
//! let service = ChatService::new(
//!     Arc::new(FileServerRegistry::user()),
//!     Arc::new(McpConnector::new(logger.clone())),
//!     provider,
//!     logger,
//! );
//! let mut fragments = service.chat(ChatRequest::new(vec![ChatMessage::user("What time is it?")]));
//! while let Some(fragment) = fragments.next().await {
//!     // forward to the client
//! }
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod mcp;
pub mod connection;
pub mod tools;
pub mod providers;
pub mod chat;
pub mod status;

// Re-export commonly used types
pub use types::{
    CancellationToken, ChatMessage, ContentPart, FinishReason, ManifestEntry, MessageContent,
    MessageRole, ResponseFragment, StreamChunk, Tool, ToolCall, ToolResult, ToolSpecError,
    ToolSpecification,
};

pub use logging::{ConsoleLogger, LogLevel, Logger, MemoryLogger, NoOpLogger};

pub use config::{
    default_config_path, ChatSettings, ConfigError, ConfigResult, FileServerRegistry,
    MemoryServerRegistry, ServerDescriptor, ServerRegistry,
};

pub use connection::{
    ConnectionError, ConnectionHandle, ConnectionManager, ConnectionResult, Connector,
    RequestScope, ToolOutput, ToolSession,
};

pub use tools::{ToolAggregator, ToolFilter, ToolNamespace};

pub use providers::{create_provider, Provider, ProviderError, ProviderModelConfig};

pub use chat::{ChatError, ChatRequest, ChatService, FragmentStream};

pub use status::{ServerState, ServerStatus, StatusReport, StatusReporter};

// MCP client using the official rmcp SDK
pub use mcp::{McpClient, McpConnector, McpError, McpResult};
