//! Tool aggregation
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐  ┌───────────────┐  ┌───────────────┐
//! │ server clock  │  │ server math   │  │ server ...    │
//! │ tools/list    │  │ tools/list    │  │ tools/list    │
//! └───────┬───────┘  └───────┬───────┘  └───────┬───────┘
//!         └──────────────────┼──────────────────┘
//!                            ▼
//! ┌─────────────────────────────────────────────────────┐
//! │  ToolAggregator                                     │
//! │  - validates each manifest, drops bad servers       │
//! │  - merges in registry order, last write wins        │
//! │  - applies the configured ToolFilter                │
//! └─────────────────────────┬───────────────────────────┘
//!                           ▼
//!        ToolNamespace: name → (spec, owning server)
//! ```

mod registry;

pub use registry::{NamespaceEntry, ToolAggregator, ToolFilter, ToolNamespace, ToolSource};
