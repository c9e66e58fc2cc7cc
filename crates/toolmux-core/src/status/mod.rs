//! Server health and tool listing
//!
//! Each check opens its own connection, lists tools and closes again; it
//! shares nothing with chat requests.

mod reporter;

pub use reporter::{ServerState, ServerStatus, StatusReport, StatusReporter};
