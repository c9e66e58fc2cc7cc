//! Mock provider for testing
//!
//! Deterministic, scriptable model turns without network access. Besides
//! plain text modes it can emit tool calls, so the invocation loop can be
//! exercised end to end against mock tool servers.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::traits::{Provider, ProviderModelConfig, StreamChatOptions, StreamResponse};
use crate::logging::Logger;
use crate::types::{CancellationToken, ChatMessage, MessageRole, StreamChunk, ToolCall};

/// One scripted generation step
#[derive(Debug, Clone)]
pub enum MockTurn {
    /// Plain text, no tool calls
    Text(String),
    /// Optional text followed by tool calls
    ToolCalls { text: String, calls: Vec<ToolCall> },
    /// Some text, then a stream error
    Error { text: String, message: String },
}

impl MockTurn {
    pub fn text(text: impl Into<String>) -> Self {
        MockTurn::Text(text.into())
    }

    /// A turn that only calls tools
    pub fn calls(calls: Vec<ToolCall>) -> Self {
        MockTurn::ToolCalls {
            text: String::new(),
            calls,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        MockTurn::Error {
            text: String::new(),
            message: message.into(),
        }
    }
}

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Return response as specific chunks
    Chunks(Vec<String>),
    /// Play one turn per call; calls past the end produce nothing
    Script(Vec<MockTurn>),
    /// Request the same tool on every call
    AlwaysToolCall { name: String, input: Value },
    /// Fail every call with a stream error
    Error(String),
    /// Return nothing (empty response)
    Empty,
}

/// Configuration for the mock provider
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Response mode
    pub mode: MockMode,
    /// Delay between chunks in milliseconds (0 = no delay)
    pub chunk_delay_ms: u64,
    /// Size of each chunk when splitting text
    pub chunk_size: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            mode: MockMode::Echo,
            chunk_delay_ms: 0,
            chunk_size: 10,
        }
    }
}

/// What the mock was asked to generate from
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub messages: Vec<ChatMessage>,
    /// Names of the tools offered to the model
    pub tools: Vec<String>,
    pub model: String,
}

/// Mock LLM provider for testing
pub struct MockProvider {
    config: MockConfig,
    calls: AtomicUsize,
    requests: Mutex<Vec<MockRequest>>,
    logger: Arc<dyn Logger>,
}

impl MockProvider {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self::with_config(MockConfig::default(), logger)
    }

    pub fn with_config(config: MockConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    fn with_mode(mode: MockMode, logger: Arc<dyn Logger>) -> Self {
        Self::with_config(
            MockConfig {
                mode,
                ..Default::default()
            },
            logger,
        )
    }

    /// Echo back the last user message
    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Echo, logger)
    }

    pub fn fixed(response: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Fixed(response.into()), logger)
    }

    pub fn chunked(chunks: Vec<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Chunks(chunks), logger)
    }

    pub fn scripted(turns: Vec<MockTurn>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Script(turns), logger)
    }

    /// Never stops asking for `name`
    pub fn always_tool_call(name: impl Into<String>, input: Value, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(
            MockMode::AlwaysToolCall {
                name: name.into(),
                input,
            },
            logger,
        )
    }

    pub fn error(message: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Error(message.into()), logger)
    }

    /// Set chunk delay
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.config.chunk_delay_ms = delay_ms;
        self
    }

    /// Set chunk size for splitting responses
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Number of generation steps requested so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    fn last_user_message(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .rev()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.plain_text())
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| "Hello from MockProvider!".to_string())
    }

    /// Split text into chunks
    fn split_into_chunks(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        if self.config.chunk_size == 0 {
            return vec![text.to_string()];
        }

        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.config.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }

    fn text_items(&self, text: &str) -> Vec<ProviderResult<StreamChunk>> {
        self.split_into_chunks(text)
            .into_iter()
            .map(|t| Ok(StreamChunk::text(t)))
            .collect()
    }

    fn turn_items(&self, turn: &MockTurn) -> Vec<ProviderResult<StreamChunk>> {
        match turn {
            MockTurn::Text(text) => self.text_items(text),
            MockTurn::ToolCalls { text, calls } => {
                let mut items = self.text_items(text);
                items.extend(calls.iter().cloned().map(|c| Ok(StreamChunk::tool_call(c))));
                items
            }
            MockTurn::Error { text, message } => {
                let mut items = self.text_items(text);
                items.push(Err(ProviderError::Other(format!("Mock error: {}", message))));
                items
            }
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        let step = self.calls.fetch_add(1, Ordering::SeqCst);
        self.logger.debug(&format!("[MockProvider] stream_chat step {}", step + 1));

        let tools = options
            .tools
            .as_ref()
            .map(|t| t.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default();
        self.requests.lock().push(MockRequest {
            messages: messages.clone(),
            tools,
            model: model.model,
        });

        let items = match &self.config.mode {
            MockMode::Echo => {
                let text = format!("Echo: {}", Self::last_user_message(&messages));
                self.text_items(&text)
            }
            MockMode::Fixed(response) => self.text_items(response),
            MockMode::Chunks(chunks) => chunks.iter().cloned().map(|c| Ok(StreamChunk::text(c))).collect(),
            MockMode::Script(turns) => match turns.get(step) {
                Some(turn) => self.turn_items(turn),
                None => Vec::new(),
            },
            MockMode::AlwaysToolCall { name, input } => {
                let call = ToolCall::new(format!("call-{}", step + 1), name.clone(), input.clone());
                vec![Ok(StreamChunk::tool_call(call))]
            }
            MockMode::Error(message) => {
                vec![Err(ProviderError::Other(format!("Mock error: {}", message)))]
            }
            MockMode::Empty => Vec::new(),
        };

        let delay_ms = self.config.chunk_delay_ms;
        let stream = stream::iter(items.into_iter().enumerate()).then(move |(i, item)| {
            let cancel = cancel_token.clone();
            async move {
                if i > 0 && delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                if cancel.is_cancelled() {
                    return Err(ProviderError::Cancelled);
                }
                item
            }
        });

        Ok(Box::pin(stream))
    }
}
