//! Provider trait definition

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::types::{CancellationToken, ChatMessage, StreamChunk, Tool};
use super::error::ProviderResult;

/// Model configuration for provider requests
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderModelConfig {
    /// Model identifier, optionally prefixed with a provider (`anthropic/claude-...`)
    pub model: String,
    /// API key; when unset the backend's own lookup applies
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ProviderModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}

/// Options for streaming chat requests
#[derive(Debug, Clone, Default)]
pub struct StreamChatOptions {
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Tools available for the model to use
    pub tools: Option<Vec<Tool>>,
}

impl StreamChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Set tools; an empty list leaves tools unset
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }
}

/// Type alias for the streaming response
pub type StreamResponse = Pin<Box<dyn Stream<Item = ProviderResult<StreamChunk>> + Send>>;

/// A language model backend
///
/// One call to [`stream_chat`](Provider::stream_chat) is one generation
/// step: text chunks followed by any complete tool calls.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., "anthropic", "mock")
    fn name(&self) -> &str;

    /// Stream a chat completion
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse>;
}
