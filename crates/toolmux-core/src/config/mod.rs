//! Server registry and configuration
//!
//! - `MemoryServerRegistry`: In-memory for tests
//! - `FileServerRegistry`: JSON/YAML file with servers and chat settings

mod traits;
mod descriptor;
mod memory;
mod file;

pub use traits::{list_or_empty, ConfigError, ConfigResult, ServerRegistry};
pub use descriptor::ServerDescriptor;
pub use memory::MemoryServerRegistry;
pub use file::{default_config_path, ChatSettings, ConfigFile, FileServerRegistry};
