//! In-memory server registry

use parking_lot::RwLock;

use super::descriptor::ServerDescriptor;
use super::traits::{ensure_unique, ConfigResult, ServerRegistry};

/// In-memory server registry for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryServerRegistry {
    servers: RwLock<Vec<ServerDescriptor>>,
}

impl MemoryServerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with initial servers
    pub fn with_servers(servers: Vec<ServerDescriptor>) -> Self {
        Self {
            servers: RwLock::new(servers),
        }
    }

    /// Replace the configured servers
    pub fn set_servers(&self, servers: Vec<ServerDescriptor>) {
        *self.servers.write() = servers;
    }
}

impl ServerRegistry for MemoryServerRegistry {
    fn list(&self) -> ConfigResult<Vec<ServerDescriptor>> {
        let servers = self.servers.read().clone();
        ensure_unique(&servers)?;
        Ok(servers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    fn clock() -> ServerDescriptor {
        ServerDescriptor::new("clock", "Clock", "http://localhost:5027")
    }

    fn math() -> ServerDescriptor {
        ServerDescriptor::new("math", "Math", "http://localhost:5028")
    }

    #[test]
    fn test_list_preserves_order() {
        let registry = MemoryServerRegistry::with_servers(vec![math(), clock()]);
        let ids: Vec<_> = registry.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["math", "clock"]);
    }

    #[test]
    fn test_get_by_id() {
        let registry = MemoryServerRegistry::with_servers(vec![clock(), math()]);

        assert_eq!(registry.get("math").unwrap(), Some(math()));
        assert_eq!(registry.get("weather").unwrap(), None);
        assert!(matches!(registry.get(""), Err(ConfigError::MissingId)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let registry = MemoryServerRegistry::with_servers(vec![clock(), clock()]);
        assert!(matches!(
            registry.list(),
            Err(ConfigError::DuplicateServer(id)) if id == "clock"
        ));
    }

    #[test]
    fn test_set_servers_reflected_on_next_list() {
        let registry = MemoryServerRegistry::new();
        assert!(registry.list().unwrap().is_empty());

        registry.set_servers(vec![clock()]);
        assert_eq!(registry.list().unwrap().len(), 1);
    }
}
