//! Tool server descriptors

use serde::{Deserialize, Serialize};

/// A configured tool server
///
/// `id` is the identity within a registry. In configuration files it may be
/// omitted, in which case the server's `name` is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawServerDescriptor")]
pub struct ServerDescriptor {
    pub id: String,
    pub name: String,
    /// Endpoint of the server's event-stream transport
    #[serde(rename = "url")]
    pub endpoint: String,
    pub description: String,
}

impl ServerDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Deserialize)]
struct RawServerDescriptor {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(alias = "url")]
    endpoint: String,
    #[serde(default)]
    description: String,
}

impl TryFrom<RawServerDescriptor> for ServerDescriptor {
    type Error = String;

    fn try_from(raw: RawServerDescriptor) -> Result<Self, Self::Error> {
        if raw.name.trim().is_empty() {
            return Err("server name must not be empty".into());
        }
        if raw.endpoint.trim().is_empty() {
            return Err(format!("server '{}' has no endpoint", raw.name));
        }
        let id = raw
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| raw.name.clone());
        Ok(Self {
            id,
            name: raw.name,
            endpoint: raw.endpoint,
            description: raw.description,
        })
    }
}
