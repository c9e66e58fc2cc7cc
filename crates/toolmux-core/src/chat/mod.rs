//! Chat requests and the tool-invocation loop
//!
//! `InvocationLoop` alternates model generation and tool dispatch over a
//! request's open connections. `ChatService` wraps one request end to end
//! and closes every connection it opened before the stream ends, on every
//! exit path.

mod error;
mod driver;
mod service;

pub use error::{ChatError, ChatResult};
pub use driver::{InvocationLoop, LoopOutcome};
pub use service::{ChatRequest, ChatService, FragmentStream};
