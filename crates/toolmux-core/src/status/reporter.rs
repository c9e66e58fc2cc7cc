//! Status reporter

use std::slice;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::config::{list_or_empty, ChatSettings, ServerDescriptor, ServerRegistry};
use crate::connection::{ConnectionManager, Connector};
use crate::logging::Logger;
use crate::types::ToolSpecification;

/// Reachability of one server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Active,
    Error,
}

/// Status of one configured server
///
/// Serializes as the descriptor's fields plus `status`, and either `tools`
/// or `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerStatus {
    #[serde(flatten)]
    pub server: ServerDescriptor,
    #[serde(rename = "status")]
    pub state: ServerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpecification>>,
}

impl ServerStatus {
    pub fn active(server: ServerDescriptor, tools: Vec<ToolSpecification>) -> Self {
        Self {
            server,
            state: ServerState::Active,
            error: None,
            tools: Some(tools),
        }
    }

    pub fn error(server: ServerDescriptor, error: impl Into<String>) -> Self {
        Self {
            server,
            state: ServerState::Error,
            error: Some(error.into()),
            tools: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ServerState::Active
    }
}

/// Body of the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub servers: Vec<ServerStatus>,
}

/// Checks every configured server
#[derive(Clone)]
pub struct StatusReporter {
    registry: Arc<dyn ServerRegistry>,
    connections: ConnectionManager,
    logger: Arc<dyn Logger>,
}

impl StatusReporter {
    pub fn new(registry: Arc<dyn ServerRegistry>, connector: Arc<dyn Connector>, logger: Arc<dyn Logger>) -> Self {
        Self {
            registry,
            connections: ConnectionManager::new(connector, Arc::clone(&logger)),
            logger,
        }
    }

    /// Use the connect and tool timeouts from chat settings
    pub fn with_settings(mut self, settings: &ChatSettings) -> Self {
        self.connections = self.connections.with_settings(settings);
        self
    }

    /// Check all servers concurrently; results follow registry order
    ///
    /// A registry error yields an empty list.
    pub async fn check_all(&self) -> Vec<ServerStatus> {
        let servers = list_or_empty(self.registry.as_ref(), self.logger.as_ref());
        let statuses = join_all(servers.iter().map(|s| self.check(s))).await;

        let active = statuses.iter().filter(|s| s.is_active()).count();
        self.logger.info(&format!(
            "[StatusReporter] {} of {} servers active",
            active,
            statuses.len()
        ));
        statuses
    }

    pub async fn report(&self) -> StatusReport {
        StatusReport {
            servers: self.check_all().await,
        }
    }

    /// Open, list tools, close
    ///
    /// The connection is closed whether or not listing succeeds.
    pub async fn check(&self, server: &ServerDescriptor) -> ServerStatus {
        let (mut scope, errors) = self.connections.open_scope(slice::from_ref(server)).await;
        if let Some(e) = errors.into_iter().next() {
            return ServerStatus::error(server.clone(), e.to_string());
        }

        let manifest = match scope.handles().first() {
            Some(handle) => handle.fetch_manifest().await,
            None => {
                return ServerStatus::error(server.clone(), "connection was not opened");
            }
        };
        scope.close_all().await;

        match manifest {
            Ok(tools) => ServerStatus::active(server.clone(), tools),
            Err(e) => {
                self.logger.warn(&format!("[StatusReporter] {}", e));
                ServerStatus::error(server.clone(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, ConfigResult, MemoryServerRegistry};
    use crate::connection::{MockConnector, MockServer};
    use crate::logging::NoOpLogger;
    use std::time::Duration;

    fn registry() -> MemoryServerRegistry {
        MemoryServerRegistry::with_servers(vec![
            ServerDescriptor::new("clock", "Clock", "A").with_description("Current time"),
            ServerDescriptor::new("math", "Math", "B"),
            ServerDescriptor::new("broken", "Broken", "C"),
        ])
    }

    fn reporter(connector: &MockConnector, registry: impl ServerRegistry + 'static) -> StatusReporter {
        StatusReporter::new(Arc::new(registry), Arc::new(connector.clone()), Arc::new(NoOpLogger))
    }

    #[tokio::test]
    async fn test_statuses_follow_registry_order() {
        // The first server is the slowest to connect
        let connector = MockConnector::new()
            .with_server("A", MockServer::new().with_tool("now").with_connect_delay(Duration::from_millis(30)))
            .with_server("B", MockServer::unreachable())
            .with_server("C", MockServer::new().failing_manifest("no tools for you"));

        let statuses = reporter(&connector, registry()).check_all().await;
        let ids: Vec<_> = statuses.iter().map(|s| s.server.id.as_str()).collect();
        assert_eq!(ids, vec!["clock", "math", "broken"]);

        assert!(statuses[0].is_active());
        assert_eq!(statuses[0].tools.as_ref().map(Vec::len), Some(1));

        for status in &statuses[1..] {
            assert_eq!(status.state, ServerState::Error);
            assert!(status.error.is_some());
            assert!(status.tools.is_none());
        }
    }

    #[tokio::test]
    async fn test_checks_run_concurrently() {
        let delay = Duration::from_millis(150);
        let connector = MockConnector::new()
            .with_server("A", MockServer::new().with_tool("now").with_connect_delay(delay))
            .with_server("B", MockServer::new().with_tool("add").with_connect_delay(delay));
        let registry = MemoryServerRegistry::with_servers(vec![
            ServerDescriptor::new("clock", "Clock", "A"),
            ServerDescriptor::new("math", "Math", "B"),
        ]);

        let started = std::time::Instant::now();
        let statuses = reporter(&connector, registry).check_all().await;
        assert!(started.elapsed() < delay * 2, "checks should overlap");

        assert!(statuses.iter().all(ServerStatus::is_active));
        assert_eq!(connector.total_closes(), 2);
    }

    #[tokio::test]
    async fn test_connection_closed_even_when_listing_fails() {
        let connector = MockConnector::new()
            .with_server("A", MockServer::new().with_tool("now"))
            .with_server("C", MockServer::new().failing_manifest("boom"));

        reporter(&connector, registry()).check_all().await;
        assert_eq!(connector.opens("A"), 1);
        assert_eq!(connector.closes("A"), 1);
        assert_eq!(connector.opens("C"), 1);
        assert_eq!(connector.closes("C"), 1);
        assert_eq!(connector.closes("B"), 0);
    }

    #[tokio::test]
    async fn test_registry_error_gives_empty_report() {
        struct Failing;
        impl ServerRegistry for Failing {
            fn list(&self) -> ConfigResult<Vec<ServerDescriptor>> {
                Err(ConfigError::Malformed("bad yaml".into()))
            }
        }

        let report = reporter(&MockConnector::new(), Failing).report().await;
        assert!(report.servers.is_empty());
    }

    #[tokio::test]
    async fn test_report_wire_format() {
        let connector = MockConnector::new().with_server("A", MockServer::new().with_tool("now"));

        let report = reporter(&connector, registry()).report().await;
        let json = serde_json::to_value(&report).unwrap();

        let clock = &json["servers"][0];
        assert_eq!(clock["id"], "clock");
        assert_eq!(clock["url"], "A");
        assert_eq!(clock["description"], "Current time");
        assert_eq!(clock["status"], "active");
        assert_eq!(clock["tools"][0]["name"], "now");
        assert!(clock.get("error").is_none());

        let math = &json["servers"][1];
        assert_eq!(math["status"], "error");
        assert!(math.get("tools").is_none());
        assert_eq!(json["servers"].as_array().map(Vec::len), Some(3));
    }
}
