//! A live session with one tool server

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::config::ServerDescriptor;
use crate::logging::Logger;
use crate::types::ToolSpecification;
use super::error::{ConnectionError, ConnectionResult};
use super::transport::{ToolOutput, ToolSession};

/// Observable state of a handle
///
/// A handle only exists once its server reached `Ready`; a server that fails
/// to connect yields a `ConnectionError` instead and has nothing to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Ready,
    Closed,
}

/// One transport session, owned by a single request
pub struct ConnectionHandle {
    server: ServerDescriptor,
    session: Option<Box<dyn ToolSession>>,
    tool_timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl ConnectionHandle {
    pub(crate) fn new(
        server: ServerDescriptor,
        session: Box<dyn ToolSession>,
        tool_timeout: Duration,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            server,
            session: Some(session),
            tool_timeout,
            logger,
        }
    }

    pub fn server(&self) -> &ServerDescriptor {
        &self.server
    }

    pub fn server_id(&self) -> &str {
        &self.server.id
    }

    pub fn state(&self) -> ConnectionState {
        if self.session.is_some() {
            ConnectionState::Ready
        } else {
            ConnectionState::Closed
        }
    }

    fn session(&self) -> ConnectionResult<&dyn ToolSession> {
        self.session.as_deref().ok_or_else(|| ConnectionError::Closed {
            server: self.server.id.clone(),
        })
    }

    /// Request the server's declared tools and validate them
    pub async fn fetch_manifest(&self) -> ConnectionResult<Vec<ToolSpecification>> {
        self.fetch_manifest_before(None).await
    }

    /// Like [`fetch_manifest`](Self::fetch_manifest), giving up at `deadline`
    /// when that comes before the tool timeout
    pub async fn fetch_manifest_before(
        &self,
        deadline: Option<Instant>,
    ) -> ConnectionResult<Vec<ToolSpecification>> {
        let session = self.session()?;
        let budget = self.budget(deadline);
        let entries = tokio::time::timeout(budget, session.list_tools())
            .await
            .map_err(|_| ConnectionError::timeout(&self.server.id, "list tools", budget))?
            .map_err(|e| ConnectionError::Manifest {
                server: self.server.id.clone(),
                message: e.to_string(),
            })?;

        let specs = ToolSpecification::from_manifest(entries).map_err(|e| {
            ConnectionError::MalformedManifest {
                server: self.server.id.clone(),
                message: e.to_string(),
            }
        })?;

        self.logger.debug(&format!(
            "[Connection] {} advertises {} tools",
            self.server.id,
            specs.len()
        ));
        Ok(specs)
    }

    /// Dispatch one tool call over this session
    pub async fn invoke(&self, tool: &str, arguments: Value) -> ConnectionResult<ToolOutput> {
        self.invoke_before(tool, arguments, None).await
    }

    /// Like [`invoke`](Self::invoke), giving up at `deadline` when that comes
    /// before the tool timeout
    pub async fn invoke_before(
        &self,
        tool: &str,
        arguments: Value,
        deadline: Option<Instant>,
    ) -> ConnectionResult<ToolOutput> {
        let session = self.session()?;
        self.logger.info(&format!("[Connection] {} <- {}", self.server.id, tool));

        let budget = self.budget(deadline);
        tokio::time::timeout(budget, session.call_tool(tool, arguments))
            .await
            .map_err(|_| ConnectionError::timeout(&self.server.id, "tool call", budget))?
            .map_err(|e| ConnectionError::Invoke {
                server: self.server.id.clone(),
                tool: tool.to_string(),
                message: e.to_string(),
            })
    }

    /// Time allowed for one operation: the tool timeout, cut short by `deadline`
    fn budget(&self, deadline: Option<Instant>) -> Duration {
        match deadline {
            Some(deadline) => self
                .tool_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.tool_timeout,
        }
    }

    /// Release the session
    ///
    /// Calling this on a closed handle is a no-op. Close failures are logged
    /// and never returned.
    pub async fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        close_session(&self.server.id, session, self.tool_timeout, self.logger.as_ref()).await;
    }

    /// Detach the live session, leaving the handle closed
    pub(crate) fn take_session(&mut self) -> Option<Box<dyn ToolSession>> {
        self.session.take()
    }

    pub(crate) fn tool_timeout(&self) -> Duration {
        self.tool_timeout
    }

    pub(crate) fn logger(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.logger)
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("server", &self.server.id)
            .field("state", &self.state())
            .finish()
    }
}

pub(crate) async fn close_session(
    server_id: &str,
    session: Box<dyn ToolSession>,
    timeout: Duration,
    logger: &dyn Logger,
) {
    match tokio::time::timeout(timeout, session.close()).await {
        Ok(Ok(())) => logger.info(&format!("[Connection] closed {}", server_id)),
        Ok(Err(e)) => logger.warn(&format!("[Connection] error closing {}: {}", server_id, e)),
        Err(_) => logger.warn(&format!(
            "[Connection] closing {} timed out after {}ms",
            server_id,
            timeout.as_millis()
        )),
    }
}
