//! Connection lifecycle
//!
//! Every chat request and status check opens its own short-lived sessions:
//!
//! ```text
//! ConnectionManager::open_all ──► (descriptor, Result<ConnectionHandle>) × N
//!                                   │
//!                        ready ones ▼
//!                             RequestScope ──► close_all (exactly once each)
//! ```
//!
//! `Connector`/`ToolSession` are the transport seam; `McpConnector` talks to
//! real MCP servers and `MockConnector` scripts them for tests.

mod error;
mod transport;
mod handle;
mod manager;
mod scope;
pub mod mock;

pub use error::{ConnectionError, ConnectionResult};
pub use transport::{Connector, ToolOutput, ToolSession};
pub use handle::{ConnectionHandle, ConnectionState};
pub use manager::{ConnectionManager, OpenOutcome};
pub use scope::RequestScope;
pub use mock::{MockConnector, MockServer, RecordedCall};
