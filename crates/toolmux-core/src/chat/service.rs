//! Chat request handling
//!
//! `ChatService::chat` runs one request on its own task:
//! registry → open connections → aggregate tools → invocation loop →
//! close connections → terminal fragment. The caller reads fragments from
//! the returned stream while the task is still producing them.

use std::pin::Pin;
use std::sync::Arc;

use futures::channel::mpsc;
use futures::{SinkExt, Stream};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::{list_or_empty, ChatSettings, ServerRegistry};
use crate::connection::{ConnectionManager, Connector, RequestScope};
use crate::logging::Logger;
use crate::providers::Provider;
use crate::tools::ToolAggregator;
use crate::types::{CancellationToken, ChatMessage, ResponseFragment};
use super::driver::{InvocationLoop, LoopOutcome};
use super::error::{ChatError, ChatResult};

/// Fragments buffered between the request task and the caller
const FRAGMENT_BUFFER: usize = 32;

/// Incoming chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Model to use; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Stream of response fragments; always ends with `finish` or `error`
/// unless the caller stops reading first
pub type FragmentStream = Pin<Box<dyn Stream<Item = ResponseFragment> + Send>>;

/// Entry point for chat requests
#[derive(Clone)]
pub struct ChatService {
    registry: Arc<dyn ServerRegistry>,
    connections: ConnectionManager,
    provider: Arc<dyn Provider>,
    settings: ChatSettings,
    logger: Arc<dyn Logger>,
}

impl ChatService {
    pub fn new(
        registry: Arc<dyn ServerRegistry>,
        connector: Arc<dyn Connector>,
        provider: Arc<dyn Provider>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            registry,
            connections: ConnectionManager::new(connector, Arc::clone(&logger)),
            provider,
            settings: ChatSettings::default(),
            logger,
        }
    }

    /// Apply chat settings, including connection timeouts
    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        let tool_timeout = settings.request_tool_timeout();
        if tool_timeout < settings.tool_timeout() {
            self.logger.warn(&format!(
                "[ChatService] tool timeout lowered to {}ms to fit the {}s request timeout",
                tool_timeout.as_millis(),
                settings.request_timeout_secs
            ));
        }
        self.connections = self
            .connections
            .with_settings(&settings)
            .with_tool_timeout(tool_timeout);
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Handle a chat request
    ///
    /// Must be called from within a tokio runtime.
    pub fn chat(&self, request: ChatRequest) -> FragmentStream {
        self.chat_with_cancel(request, CancellationToken::new())
    }

    /// Handle a chat request that can be cancelled from outside
    pub fn chat_with_cancel(&self, request: ChatRequest, cancel: CancellationToken) -> FragmentStream {
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let service = self.clone();
        tokio::spawn(async move {
            service.execute(request, tx, cancel).await;
        });
        Box::pin(rx)
    }

    async fn execute(
        self,
        request: ChatRequest,
        mut tx: mpsc::Sender<ResponseFragment>,
        cancel: CancellationToken,
    ) {
        let servers = list_or_empty(self.registry.as_ref(), self.logger.as_ref());
        let (mut scope, failures) = self.connections.open_scope(&servers).await;
        self.logger.info(&format!(
            "[ChatService] {} of {} servers ready",
            scope.len(),
            servers.len()
        ));
        for failure in &failures {
            self.logger.warn(&format!("[ChatService] {}", failure));
        }

        let timeout = self.settings.request_timeout();
        let tool_deadline = Instant::now() + timeout.saturating_sub(self.settings.answer_reserve());
        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, self.drive(&scope, request, tool_deadline, &mut tx, &cancel)) => {
                result.unwrap_or(Err(ChatError::Timeout(timeout)))
            }
            _ = cancel.cancelled() => Err(ChatError::Cancelled),
        };

        scope.close_all().await;

        let terminal = match outcome {
            Ok(outcome) => {
                self.logger.info(&format!(
                    "[ChatService] finished after {} steps ({:?})",
                    outcome.steps, outcome.reason
                ));
                ResponseFragment::from(outcome)
            }
            Err(ChatError::Disconnected) => {
                self.logger.info("[ChatService] caller disconnected; connections closed");
                return;
            }
            Err(e) => {
                self.logger.error(&format!("[ChatService] {}", e));
                ResponseFragment::error(e.to_string())
            }
        };

        if tx.send(terminal).await.is_err() {
            self.logger.debug("[ChatService] caller left before the final fragment");
        }
    }

    /// Aggregate and run the loop over an already opened scope
    async fn drive(
        &self,
        scope: &RequestScope,
        request: ChatRequest,
        tool_deadline: Instant,
        tx: &mut mpsc::Sender<ResponseFragment>,
        cancel: &CancellationToken,
    ) -> ChatResult<LoopOutcome> {
        let aggregator = ToolAggregator::new(Arc::clone(&self.logger))
            .with_filter(self.settings.tool_filter.clone())
            .with_deadline(tool_deadline);
        let (namespace, _) = aggregator.aggregate(scope).await;

        let model = self.settings.model_config(request.model);
        let mut conversation = request.messages;

        InvocationLoop::new(
            self.provider.as_ref(),
            &namespace,
            scope,
            model,
            Arc::clone(&self.logger),
        )
        .with_max_steps(self.settings.max_steps)
        .with_options(self.settings.stream_options())
        .with_tool_deadline(tool_deadline)
        .run(&mut conversation, tx, cancel)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryServerRegistry, ServerDescriptor};
    use crate::connection::{MockConnector, MockServer};
    use crate::logging::NoOpLogger;
    use crate::providers::{MockProvider, MockTurn};
    use crate::types::{FinishReason, ToolCall};
    use futures::StreamExt;
    use serde_json::json;
    use std::time::Duration;

    fn service(connector: &MockConnector, provider: MockProvider) -> ChatService {
        let registry = MemoryServerRegistry::with_servers(vec![
            ServerDescriptor::new("clock", "Clock", "A"),
            ServerDescriptor::new("math", "Math", "B"),
        ]);
        ChatService::new(
            Arc::new(registry),
            Arc::new(connector.clone()),
            Arc::new(provider),
            Arc::new(NoOpLogger),
        )
    }

    fn connector() -> MockConnector {
        MockConnector::new()
            .with_server("A", MockServer::new().with_tool("now"))
            .with_server("B", MockServer::new().with_tool("add"))
    }

    #[tokio::test]
    async fn test_stream_ends_with_finish_after_close() {
        let connector = connector();
        let provider = MockProvider::scripted(
            vec![
                MockTurn::calls(vec![ToolCall::new("c1", "now", json!({}))]),
                MockTurn::text("done"),
            ],
            Arc::new(NoOpLogger),
        );

        let fragments: Vec<_> = service(&connector, provider)
            .chat(ChatRequest::new(vec![ChatMessage::user("time?")]))
            .collect()
            .await;

        assert_eq!(
            fragments.last(),
            Some(&ResponseFragment::Finish { reason: FinishReason::Stop, steps: 2 })
        );
        assert_eq!(connector.total_opens(), 2);
        assert_eq!(connector.total_closes(), 2);
    }

    #[tokio::test]
    async fn test_model_error_becomes_error_fragment() {
        let connector = connector();
        let provider = MockProvider::error("overloaded", Arc::new(NoOpLogger));

        let fragments: Vec<_> = service(&connector, provider)
            .chat(ChatRequest::new(vec![ChatMessage::user("hi")]))
            .collect()
            .await;

        assert_eq!(fragments.len(), 1);
        assert!(matches!(&fragments[0], ResponseFragment::Error { message } if message.contains("overloaded")));
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let connector = connector();
        let provider = MockProvider::fixed("a very slow answer", Arc::new(NoOpLogger))
            .with_chunk_size(1)
            .with_delay(1_000);
        let mut settings = ChatSettings::default();
        settings.request_timeout_secs = 1;

        let fragments: Vec<_> = service(&connector, provider)
            .with_settings(settings)
            .chat(ChatRequest::new(vec![ChatMessage::user("hi")]))
            .collect()
            .await;

        assert!(matches!(fragments.last(), Some(ResponseFragment::Error { message }) if message.contains("timed out")));
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_tool_fails_the_call_not_the_request() {
        let connector = MockConnector::new()
            .with_server(
                "A",
                MockServer::new().with_tool("now").with_call_delay(Duration::from_secs(3600)),
            )
            .with_server("B", MockServer::new().with_tool("add"));
        let provider = MockProvider::scripted(
            vec![
                MockTurn::ToolCalls {
                    text: "checking".into(),
                    calls: vec![ToolCall::new("c1", "now", json!({}))],
                },
                MockTurn::text("The clock is not answering."),
            ],
            Arc::new(NoOpLogger),
        )
        .with_delay(100);

        let fragments: Vec<_> = service(&connector, provider)
            .with_settings(ChatSettings::default())
            .chat(ChatRequest::new(vec![ChatMessage::user("time?")]))
            .collect()
            .await;

        assert!(fragments.iter().any(|f| matches!(
            f,
            ResponseFragment::ToolResult { name, is_error: true, .. } if name == "now"
        )));
        assert!(!fragments.iter().any(|f| matches!(f, ResponseFragment::Error { .. })));
        assert_eq!(
            fragments.last(),
            Some(&ResponseFragment::Finish { reason: FinishReason::Stop, steps: 2 })
        );
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_closes_connections() {
        let connector = connector();
        let provider = MockProvider::fixed("a long answer", Arc::new(NoOpLogger))
            .with_chunk_size(1)
            .with_delay(50);
        let cancel = CancellationToken::new();

        let mut stream = service(&connector, provider)
            .chat_with_cancel(ChatRequest::new(vec![ChatMessage::user("hi")]), cancel.clone());
        assert!(matches!(stream.next().await, Some(ResponseFragment::Text { .. })));

        cancel.cancel();
        let rest: Vec<_> = stream.collect().await;
        assert!(matches!(rest.last(), Some(ResponseFragment::Error { message }) if message.to_lowercase().contains("cancelled")));
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_request_model_overrides_default() {
        let connector = connector();
        let provider = Arc::new(MockProvider::fixed("ok", Arc::new(NoOpLogger)));
        let registry = MemoryServerRegistry::new();
        let service = ChatService::new(
            Arc::new(registry),
            Arc::new(connector.clone()),
            provider.clone(),
            Arc::new(NoOpLogger),
        );

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]).with_model("openai/gpt-4o");
        let _: Vec<_> = service.chat(request).collect().await;
        let _: Vec<_> = service.chat(ChatRequest::new(vec![ChatMessage::user("hi")])).collect().await;

        let models: Vec<_> = provider.requests().into_iter().map(|r| r.model).collect();
        assert_eq!(models, vec!["openai/gpt-4o".to_string(), ChatSettings::default().default_model]);
    }

    #[test]
    fn test_request_wire_format() {
        let request: ChatRequest = serde_json::from_value(json!({
            "messages": [{ "role": "user", "content": "What time is it?" }]
        }))
        .unwrap();
        assert!(request.model.is_none());
        assert_eq!(request.messages[0].plain_text(), "What time is it?");
    }
}
