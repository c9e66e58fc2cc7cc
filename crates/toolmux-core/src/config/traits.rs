//! Server registry trait and configuration errors

use std::collections::HashSet;
use std::path::PathBuf;

use crate::logging::Logger;
use super::descriptor::ServerDescriptor;

/// Source of the configured tool servers
///
/// Implementations:
/// - `MemoryServerRegistry`: In-memory, for tests and embedding
/// - `FileServerRegistry`: JSON/YAML file, re-read on every call
pub trait ServerRegistry: Send + Sync {
    /// All configured servers, in configuration order
    fn list(&self) -> ConfigResult<Vec<ServerDescriptor>>;

    /// Look up a single server by id
    fn get(&self, id: &str) -> ConfigResult<Option<ServerDescriptor>> {
        if id.is_empty() {
            return Err(ConfigError::MissingId);
        }
        Ok(self.list()?.into_iter().find(|s| s.id == id))
    }
}

/// Errors that can occur while producing the server list
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed configuration: {0}")]
    Malformed(String),

    #[error("Duplicate server id: {0}")]
    DuplicateServer(String),

    #[error("Server id must be provided")]
    MissingId,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reject server lists where two entries share an id
pub(crate) fn ensure_unique(servers: &[ServerDescriptor]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for server in servers {
        if !seen.insert(server.id.as_str()) {
            return Err(ConfigError::DuplicateServer(server.id.clone()));
        }
    }
    Ok(())
}

/// List servers, degrading a configuration failure to "no servers"
pub fn list_or_empty(registry: &dyn ServerRegistry, logger: &dyn Logger) -> Vec<ServerDescriptor> {
    match registry.list() {
        Ok(servers) => servers,
        Err(e) => {
            logger.error(&format!(
                "[ServerRegistry] {}; continuing with no tool servers",
                e
            ));
            Vec::new()
        }
    }
}
