//! Opens per-request connections to every configured server

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::config::{ChatSettings, ServerDescriptor};
use crate::logging::Logger;
use super::error::{ConnectionError, ConnectionResult};
use super::handle::ConnectionHandle;
use super::scope::RequestScope;
use super::transport::Connector;

/// Outcome of opening one server
pub type OpenOutcome = (ServerDescriptor, ConnectionResult<ConnectionHandle>);

/// Connection lifecycle manager
///
/// Stateless between requests: every call to [`open_all`](Self::open_all)
/// produces fresh handles that belong to the caller.
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
    tool_timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, logger: Arc<dyn Logger>) -> Self {
        let defaults = ChatSettings::default();
        Self {
            connector,
            connect_timeout: defaults.connect_timeout(),
            tool_timeout: defaults.tool_timeout(),
            logger,
        }
    }

    /// Take both timeouts from chat settings
    pub fn with_settings(mut self, settings: &ChatSettings) -> Self {
        self.connect_timeout = settings.connect_timeout();
        self.tool_timeout = settings.tool_timeout();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Open a session to one server
    ///
    /// Timeouts and refusals come back as a `ConnectionError` tagged with
    /// the server's id.
    pub async fn open(&self, server: &ServerDescriptor) -> ConnectionResult<ConnectionHandle> {
        self.logger.debug(&format!(
            "[ConnectionManager] connecting to {} at {}",
            server.id, server.endpoint
        ));

        let session = tokio::time::timeout(self.connect_timeout, self.connector.connect(server))
            .await
            .map_err(|_| ConnectionError::timeout(&server.id, "connect", self.connect_timeout))?
            .map_err(|e| ConnectionError::connect(&server.id, e.to_string()))?;

        self.logger.info(&format!("[ConnectionManager] {} ready", server.id));
        Ok(ConnectionHandle::new(
            server.clone(),
            session,
            self.tool_timeout,
            Arc::clone(&self.logger),
        ))
    }

    /// Open every server concurrently
    ///
    /// One entry per input descriptor, in input order, whatever order the
    /// connections complete in.
    pub async fn open_all(&self, servers: &[ServerDescriptor]) -> Vec<OpenOutcome> {
        let attempts = servers.iter().map(|server| async move {
            let result = self.open(server).await;
            if let Err(e) = &result {
                self.logger.warn(&format!("[ConnectionManager] {}", e));
            }
            (server.clone(), result)
        });
        join_all(attempts).await
    }

    /// Open every server and collect the ready ones into a request scope
    pub async fn open_scope(&self, servers: &[ServerDescriptor]) -> (RequestScope, Vec<ConnectionError>) {
        let outcomes = self.open_all(servers).await;
        RequestScope::from_outcomes(outcomes, Arc::clone(&self.logger))
    }
}
