//! Tool namespace and aggregation
//!
//! The aggregator is the central component for:
//! - Fetching manifests from every ready connection of a request
//! - Dropping servers whose manifest cannot be fetched or validated
//! - Merging everything into one flat namespace (last write wins)
//! - Remembering which server owns each tool, for dispatch

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::connection::{ConnectionError, RequestScope};
use crate::logging::Logger;
use crate::types::{Tool, ToolSpecification};

/// Filter applied while merging manifests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolFilter {
    /// If set, only include tools with these names
    pub include: Option<HashSet<String>>,
    /// Exclude tools with these names
    pub exclude: HashSet<String>,
}

impl ToolFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include only specific tools
    pub fn with_include(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.include = Some(names.into_iter().collect());
        self
    }

    /// Exclude specific tools
    pub fn with_exclude(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.exclude = names.into_iter().collect();
        self
    }

    /// Check if a tool name passes this filter
    pub fn matches(&self, name: &str) -> bool {
        if self.exclude.contains(name) {
            return false;
        }
        match &self.include {
            Some(include) => include.contains(name),
            None => true,
        }
    }
}

/// A tool in the namespace together with its owning server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub spec: ToolSpecification,
    pub server_id: String,
}

/// Tools contributed by one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSource {
    pub server_id: String,
    pub tools: Vec<String>,
}

/// Flat, per-request mapping from tool name to owning server
#[derive(Debug, Clone, Default)]
pub struct ToolNamespace {
    entries: HashMap<String, NamespaceEntry>,
    /// Names in first-seen order, for a stable tool list
    order: Vec<String>,
    sources: Vec<ToolSource>,
}

impl ToolNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tool, replacing any earlier owner
    ///
    /// Returns the id of the server that previously owned the name.
    pub fn insert(&mut self, server_id: &str, spec: ToolSpecification) -> Option<String> {
        let name = spec.name.clone();
        let entry = NamespaceEntry {
            spec,
            server_id: server_id.to_string(),
        };
        match self.entries.insert(name.clone(), entry) {
            Some(previous) => Some(previous.server_id),
            None => {
                self.order.push(name);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&NamespaceEntry> {
        self.entries.get(name)
    }

    /// Id of the server that owns `name`
    pub fn owner(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.server_id.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tool names in stable order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Specifications in stable order
    pub fn specs(&self) -> impl Iterator<Item = &ToolSpecification> {
        self.order.iter().filter_map(|n| self.entries.get(n)).map(|e| &e.spec)
    }

    /// Tools for sending to the model
    pub fn llm_tools(&self) -> Vec<Tool> {
        self.specs().map(Tool::from).collect()
    }

    /// Which servers contributed which tools, in registry order
    pub fn sources(&self) -> &[ToolSource] {
        &self.sources
    }
}

/// Builds a [`ToolNamespace`] from a request's open connections
pub struct ToolAggregator {
    filter: ToolFilter,
    deadline: Option<Instant>,
    logger: Arc<dyn Logger>,
}

impl ToolAggregator {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            filter: ToolFilter::default(),
            deadline: None,
            logger,
        }
    }

    pub fn with_filter(mut self, filter: ToolFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Stop waiting on manifests at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Fetch all manifests concurrently and merge them in scope order
    ///
    /// A server whose manifest fails is left out; its error is returned
    /// alongside the namespace.
    pub async fn aggregate(&self, scope: &RequestScope) -> (ToolNamespace, Vec<ConnectionError>) {
        let deadline = self.deadline;
        let fetches = scope
            .handles()
            .iter()
            .map(|handle| async move { (handle.server_id(), handle.fetch_manifest_before(deadline).await) });
        let manifests = join_all(fetches).await;

        let mut namespace = ToolNamespace::new();
        let mut failures = Vec::new();

        for (server_id, manifest) in manifests {
            let specs = match manifest {
                Ok(specs) => specs,
                Err(e) => {
                    self.logger.warn(&format!("[ToolAggregator] skipping server: {}", e));
                    failures.push(e);
                    continue;
                }
            };

            let mut contributed = Vec::new();
            for spec in specs {
                if !self.filter.matches(&spec.name) {
                    self.logger.debug(&format!("[ToolAggregator] filtered out {}", spec.name));
                    continue;
                }
                let name = spec.name.clone();
                if let Some(previous) = namespace.insert(server_id, spec) {
                    self.logger.warn(&format!(
                        "[ToolAggregator] tool '{}' from {} replaces the one from {}",
                        name, server_id, previous
                    ));
                    for source in namespace.sources.iter_mut().filter(|s| s.server_id == previous) {
                        source.tools.retain(|t| *t != name);
                    }
                }
                contributed.push(name);
            }
            namespace.sources.push(ToolSource {
                server_id: server_id.to_string(),
                tools: contributed,
            });
        }

        self.logger.info(&format!(
            "[ToolAggregator] {} tools from {} servers",
            namespace.len(),
            namespace.sources.len()
        ));
        (namespace, failures)
    }
}
