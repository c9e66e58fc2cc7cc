//! Core types shared by the registry, connections, providers and the chat loop

mod message;
mod tool;
mod stream;
mod cancellation;

pub use message::{ChatMessage, ContentPart, MessageRole, MessageContent};
pub use tool::{ManifestEntry, Tool, ToolCall, ToolResult, ToolSpecError, ToolSpecification};
pub use stream::{FinishReason, ResponseFragment, StreamChunk};
pub use cancellation::CancellationToken;
