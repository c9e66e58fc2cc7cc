//! Mock connector for testing
//!
//! Scripted in-process tool servers keyed by endpoint. Every open, close and
//! tool call is recorded so tests can check that connections are paired.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::ServerDescriptor;
use crate::mcp::{McpError, McpResult};
use crate::types::ManifestEntry;
use super::transport::{Connector, ToolOutput, ToolSession};

/// Behaviour of one scripted server
#[derive(Debug, Clone, Default)]
pub struct MockServer {
    tools: Vec<ManifestEntry>,
    responses: HashMap<String, ToolOutput>,
    failing_tools: HashSet<String>,
    unreachable: bool,
    connect_delay: Option<Duration>,
    call_delay: Option<Duration>,
    manifest_delay: Option<Duration>,
    manifest_error: Option<String>,
    close_error: bool,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a tool with no schema
    pub fn with_tool(self, name: impl Into<String>) -> Self {
        self.with_entry(ManifestEntry::new(name))
    }

    /// Advertise an arbitrary (possibly invalid) manifest entry
    pub fn with_entry(mut self, entry: ManifestEntry) -> Self {
        self.tools.push(entry);
        self
    }

    /// Fixed output for a tool; other tools answer `"<name> ok"`
    pub fn responding(mut self, tool: impl Into<String>, text: impl Into<String>) -> Self {
        self.responses.insert(tool.into(), ToolOutput::text(text));
        self
    }

    /// The tool runs but the server reports failure
    pub fn erroring(mut self, tool: impl Into<String>, text: impl Into<String>) -> Self {
        self.responses.insert(tool.into(), ToolOutput::failure(text));
        self
    }

    /// Calls to the tool fail at the transport level
    pub fn failing_tool(mut self, tool: impl Into<String>) -> Self {
        self.failing_tools.insert(tool.into());
        self
    }

    /// Refuse connections
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    pub fn with_manifest_delay(mut self, delay: Duration) -> Self {
        self.manifest_delay = Some(delay);
        self
    }

    /// Connect succeeds but listing tools fails
    pub fn failing_manifest(mut self, message: impl Into<String>) -> Self {
        self.manifest_error = Some(message.into());
        self
    }

    /// Close is recorded but reports an error
    pub fn failing_close(mut self) -> Self {
        self.close_error = true;
        self
    }
}

/// A recorded tool call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: String,
    pub tool: String,
    pub arguments: Value,
}

#[derive(Debug, Default)]
struct MockStats {
    opens: Mutex<HashMap<String, usize>>,
    closes: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// Connector over scripted servers
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    servers: HashMap<String, MockServer>,
    stats: Arc<MockStats>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `server` at `endpoint`; unknown endpoints refuse connections
    pub fn with_server(mut self, endpoint: impl Into<String>, server: MockServer) -> Self {
        self.servers.insert(endpoint.into(), server);
        self
    }

    /// Successful opens of `endpoint`
    pub fn opens(&self, endpoint: &str) -> usize {
        self.stats.opens.lock().get(endpoint).copied().unwrap_or(0)
    }

    /// Close attempts on `endpoint`
    pub fn closes(&self, endpoint: &str) -> usize {
        self.stats.closes.lock().get(endpoint).copied().unwrap_or(0)
    }

    pub fn total_opens(&self) -> usize {
        self.stats.opens.lock().values().sum()
    }

    pub fn total_closes(&self) -> usize {
        self.stats.closes.lock().values().sum()
    }

    /// Sessions opened but not yet closed
    pub fn open_sessions(&self) -> usize {
        self.total_opens().saturating_sub(self.total_closes())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.stats.calls.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, server: &ServerDescriptor) -> McpResult<Box<dyn ToolSession>> {
        let Some(script) = self.servers.get(&server.endpoint).cloned() else {
            return Err(McpError::ConnectionFailed(format!(
                "connection refused: {}",
                server.endpoint
            )));
        };

        if let Some(delay) = script.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if script.unreachable {
            return Err(McpError::ConnectionFailed(format!(
                "connection refused: {}",
                server.endpoint
            )));
        }

        *self
            .stats
            .opens
            .lock()
            .entry(server.endpoint.clone())
            .or_insert(0) += 1;

        Ok(Box::new(MockSession {
            endpoint: server.endpoint.clone(),
            script,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MockSession {
    endpoint: String,
    script: MockServer,
    stats: Arc<MockStats>,
}

#[async_trait]
impl ToolSession for MockSession {
    async fn list_tools(&self) -> McpResult<Vec<ManifestEntry>> {
        if let Some(delay) = self.script.manifest_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script.manifest_error {
            Some(message) => Err(McpError::Protocol(message.clone())),
            None => Ok(self.script.tools.clone()),
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
        self.stats.calls.lock().push(RecordedCall {
            endpoint: self.endpoint.clone(),
            tool: name.to_string(),
            arguments,
        });

        if let Some(delay) = self.script.call_delay {
            tokio::time::sleep(delay).await;
        }
        if self.script.failing_tools.contains(name) {
            return Err(McpError::ToolCallFailed(format!("{} crashed", name)));
        }
        Ok(self
            .script
            .responses
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolOutput::text(format!("{} ok", name))))
    }

    async fn close(self: Box<Self>) -> McpResult<()> {
        *self
            .stats
            .closes
            .lock()
            .entry(self.endpoint.clone())
            .or_insert(0) += 1;

        if self.script.close_error {
            return Err(McpError::Protocol("session already gone".into()));
        }
        Ok(())
    }
}
