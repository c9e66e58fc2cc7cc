//! File-based server registry (JSON or YAML)
//!
//! Default location is `<config dir>/toolmux/servers.yaml`. A file looks like:
//!
//! ```yaml
//! servers:
//!   - id: clock
//!     name: Clock
//!     url: http://localhost:5027
//!     description: Current date and time
//! chat:
//!   max_steps: 5
//! ```
//!
//! The top-level key `clients` is accepted as an alias of `servers`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::{ProviderModelConfig, StreamChatOptions};
use crate::tools::ToolFilter;
use super::descriptor::ServerDescriptor;
use super::traits::{ensure_unique, ConfigError, ConfigResult, ServerRegistry};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Configured tool servers
    #[serde(default, alias = "clients")]
    pub servers: Vec<ServerDescriptor>,

    /// Chat loop and connection settings
    #[serde(default)]
    pub chat: ChatSettings,
}

/// Settings for the chat loop and per-request connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Maximum generation steps per request
    pub max_steps: usize,
    /// Timeout for opening one server connection
    pub connect_timeout_ms: u64,
    /// Timeout for a manifest fetch or a single tool call
    pub tool_timeout_ms: u64,
    /// Upper bound for a whole chat request
    pub request_timeout_secs: u64,
    /// Model used when a request does not name one
    pub default_model: String,
    /// Tools to hide from the model
    pub tool_filter: ToolFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Endpoint override for the model backend (azure, self-hosted gateways)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_steps: 5,
            connect_timeout_ms: 10_000,
            tool_timeout_ms: 20_000,
            request_timeout_secs: 60,
            default_model: "anthropic/claude-3-5-haiku-latest".to_string(),
            tool_filter: ToolFilter::default(),
            temperature: None,
            max_tokens: None,
            api_base: None,
        }
    }
}

impl ChatSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Tool timeout used inside a chat request
    ///
    /// Capped at a third of the request timeout so that a hung server turns
    /// into a failed tool result instead of a timed-out request.
    pub fn request_tool_timeout(&self) -> Duration {
        self.tool_timeout().min(self.request_timeout() / 3)
    }

    /// Part of the request budget kept free of tool work for the model's
    /// final answer
    pub fn answer_reserve(&self) -> Duration {
        self.request_timeout() / 4
    }

    /// Model config for a request, falling back to `default_model`
    pub fn model_config(&self, requested: Option<String>) -> ProviderModelConfig {
        let config = ProviderModelConfig::new(requested.unwrap_or_else(|| self.default_model.clone()));
        match &self.api_base {
            Some(base) => config.with_api_base(base.clone()),
            None => config,
        }
    }

    /// Generation options shared by every step of a request
    pub fn stream_options(&self) -> StreamChatOptions {
        let mut options = StreamChatOptions::new();
        if let Some(temperature) = self.temperature {
            options = options.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        options
    }
}

/// Default configuration path (`<config dir>/toolmux/servers.yaml`)
pub fn default_config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
    config_dir.join("toolmux").join("servers.yaml")
}

/// Server registry backed by a configuration file
///
/// The file is read on every call so edits show up without a restart.
#[derive(Debug, Clone)]
pub struct FileServerRegistry {
    path: PathBuf,
}

impl FileServerRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry at the default user configuration path
    pub fn user() -> Self {
        Self::new(default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole file
    pub fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound(self.path.clone()));
        }
        let content = fs::read_to_string(&self.path)?;
        let config = parse_config(&self.path, &content)?;
        ensure_unique(&config.servers)?;
        Ok(config)
    }

    /// Chat settings from the file, or defaults when the file is absent
    pub fn settings(&self) -> ConfigResult<ChatSettings> {
        match self.load() {
            Ok(config) => Ok(config.chat),
            Err(ConfigError::NotFound(_)) => Ok(ChatSettings::default()),
            Err(e) => Err(e),
        }
    }
}

fn parse_config(path: &Path, content: &str) -> ConfigResult<ConfigFile> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(content)
            .map_err(|e| ConfigError::Malformed(format!("Failed to parse JSON: {}", e)))
    } else {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Malformed(format!("Failed to parse YAML: {}", e)))
    }
}

impl ServerRegistry for FileServerRegistry {
    fn list(&self) -> ConfigResult<Vec<ServerDescriptor>> {
        Ok(self.load()?.servers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_clients_json_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sse-clients.json");
        fs::write(
            &path,
            r#"{
                "clients": [
                    { "id": "clock", "name": "Clock", "url": "http://localhost:5027", "description": "Time" },
                    { "id": "math", "name": "Math", "url": "http://localhost:5028", "description": "Sums" }
                ]
            }"#,
        )
        .unwrap();

        let registry = FileServerRegistry::new(&path);
        let servers = registry.list().unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].id, "clock");
        assert_eq!(servers[1].endpoint, "http://localhost:5028");
        assert_eq!(registry.settings().unwrap(), ChatSettings::default());
    }

    #[test]
    fn test_reads_yaml_with_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.yaml");
        fs::write(
            &path,
            "servers:\n  - name: clock\n    url: http://localhost:5027\nchat:\n  max_steps: 8\n  tool_filter:\n    exclude: [shutdown]\n",
        )
        .unwrap();

        let registry = FileServerRegistry::new(&path);
        assert_eq!(registry.list().unwrap()[0].id, "clock");

        let settings = registry.settings().unwrap();
        assert_eq!(settings.max_steps, 8);
        assert_eq!(settings.request_timeout_secs, 60);
        assert!(settings.tool_filter.exclude.contains("shutdown"));
    }

    #[test]
    fn test_tool_timeout_stays_inside_request_budget() {
        let defaults = ChatSettings::default();
        assert_eq!(defaults.request_tool_timeout(), defaults.tool_timeout());
        assert!(defaults.request_tool_timeout() + defaults.answer_reserve() < defaults.request_timeout());

        let tight = ChatSettings {
            tool_timeout_ms: 30_000,
            request_timeout_secs: 30,
            ..ChatSettings::default()
        };
        assert_eq!(tight.request_tool_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_model_settings() {
        let settings: ChatSettings = serde_yaml::from_str(
            "default_model: openai/gpt-4o-mini\ntemperature: 0.2\nmax_tokens: 512\napi_base: http://gateway:8080/v1\n",
        )
        .unwrap();

        let model = settings.model_config(None);
        assert_eq!(model.model, "openai/gpt-4o-mini");
        assert_eq!(model.api_base.as_deref(), Some("http://gateway:8080/v1"));
        assert_eq!(settings.model_config(Some("mock/x".into())).model, "mock/x");

        let options = settings.stream_options();
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, Some(512));
        assert!(options.tools.is_none());

        let defaults = ChatSettings::default().stream_options();
        assert!(defaults.temperature.is_none() && defaults.max_tokens.is_none());
    }

    #[test]
    fn test_missing_file_is_error_for_list_but_default_settings() {
        let dir = tempdir().unwrap();
        let registry = FileServerRegistry::new(dir.path().join("absent.yaml"));

        assert!(matches!(registry.list(), Err(ConfigError::NotFound(_))));
        assert_eq!(registry.settings().unwrap(), ChatSettings::default());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.json");
        fs::write(&path, "{ \"servers\": [ { \"name\": 3 } ] }").unwrap();

        let registry = FileServerRegistry::new(&path);
        assert!(matches!(registry.list(), Err(ConfigError::Malformed(_))));
        assert!(registry.settings().is_err());
    }

    #[test]
    fn test_file_changes_are_picked_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.yaml");
        fs::write(&path, "servers: []\n").unwrap();

        let registry = FileServerRegistry::new(&path);
        assert!(registry.list().unwrap().is_empty());

        fs::write(&path, "servers:\n  - name: clock\n    url: http://a\n").unwrap();
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_default_path_ends_with_toolmux() {
        let path = default_config_path();
        assert!(path.ends_with("toolmux/servers.yaml"));
    }
}
