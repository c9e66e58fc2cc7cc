//! Tool-invocation loop
//!
//! ```text
//! Generating ──tool calls──► Dispatching ──results──► Generating ... ──► Done
//!      │                                                             ▲
//!      └──────────────────── no tool calls / max steps ──────────────┘
//! ```
//!
//! Fragments are pushed into a sink as soon as they exist; the loop never
//! buffers a whole turn before forwarding it.

use std::sync::Arc;

use futures::{Sink, SinkExt, StreamExt};
use tokio::time::Instant;

use crate::connection::RequestScope;
use crate::logging::Logger;
use crate::providers::{Provider, ProviderModelConfig, StreamChatOptions};
use crate::tools::ToolNamespace;
use crate::types::{
    CancellationToken, ChatMessage, FinishReason, ResponseFragment, StreamChunk, Tool, ToolCall,
    ToolResult,
};
use super::error::{ChatError, ChatResult};

/// How a loop run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub reason: FinishReason,
    /// Generation steps that ran
    pub steps: usize,
}

impl From<LoopOutcome> for ResponseFragment {
    fn from(outcome: LoopOutcome) -> Self {
        ResponseFragment::Finish {
            reason: outcome.reason,
            steps: outcome.steps,
        }
    }
}

/// Drives generation and tool dispatch for one request
///
/// Borrows the request's namespace and scope; it never opens or closes
/// connections itself.
pub struct InvocationLoop<'a> {
    provider: &'a dyn Provider,
    namespace: &'a ToolNamespace,
    scope: &'a RequestScope,
    model: ProviderModelConfig,
    options: StreamChatOptions,
    max_steps: usize,
    tool_deadline: Option<Instant>,
    logger: Arc<dyn Logger>,
}

impl<'a> InvocationLoop<'a> {
    pub fn new(
        provider: &'a dyn Provider,
        namespace: &'a ToolNamespace,
        scope: &'a RequestScope,
        model: ProviderModelConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            provider,
            namespace,
            scope,
            model,
            options: StreamChatOptions::default(),
            max_steps: 5,
            tool_deadline: None,
            logger,
        }
    }

    /// Bound on generation steps; zero is treated as one
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Tool calls still running at `deadline` fail instead of waiting out
    /// their own timeout
    pub fn with_tool_deadline(mut self, deadline: Instant) -> Self {
        self.tool_deadline = Some(deadline);
        self
    }

    /// Generation options for every step; tools are filled in per step
    pub fn with_options(mut self, options: StreamChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Run until the model stops calling tools or the step bound is hit
    ///
    /// Assistant and tool messages are appended to `conversation` as the
    /// loop goes. A failing sink means the caller went away and ends the
    /// run with [`ChatError::Disconnected`].
    pub async fn run<S>(
        &self,
        conversation: &mut Vec<ChatMessage>,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> ChatResult<LoopOutcome>
    where
        S: Sink<ResponseFragment> + Unpin,
    {
        let tools = self.namespace.llm_tools();
        let mut steps = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ChatError::Cancelled);
            }
            steps += 1;

            let (text, calls) = self.generate(conversation, &tools, sink, cancel).await?;
            if calls.is_empty() {
                if !text.is_empty() {
                    conversation.push(ChatMessage::assistant(text));
                }
                return Ok(LoopOutcome {
                    reason: FinishReason::Stop,
                    steps,
                });
            }

            self.logger.debug(&format!("[ChatLoop] step {}: {} tool calls", steps, calls.len()));
            conversation.push(ChatMessage::assistant_tool_calls(&text, &calls));
            let results = self.dispatch(&calls, sink).await?;
            conversation.push(ChatMessage::tool_results(&results));

            if steps >= self.max_steps {
                self.logger.info(&format!("[ChatLoop] stopping at step bound {}", self.max_steps));
                return Ok(LoopOutcome {
                    reason: FinishReason::MaxSteps,
                    steps,
                });
            }
        }
    }

    /// One generation step: forward text, collect complete tool calls
    async fn generate<S>(
        &self,
        conversation: &[ChatMessage],
        tools: &[Tool],
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> ChatResult<(String, Vec<ToolCall>)>
    where
        S: Sink<ResponseFragment> + Unpin,
    {
        let options = self.options.clone().with_tools(tools.to_vec());
        let mut stream = self
            .provider
            .stream_chat(conversation.to_vec(), self.model.clone(), options, cancel.clone())
            .await?;

        let mut text = String::new();
        let mut calls = Vec::new();

        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Text { text: delta } => {
                    if delta.is_empty() {
                        continue;
                    }
                    text.push_str(&delta);
                    emit(sink, ResponseFragment::text(delta)).await?;
                }
                StreamChunk::ToolCall { tool_call } => {
                    emit(
                        sink,
                        ResponseFragment::ToolCall {
                            tool_call: tool_call.clone(),
                        },
                    )
                    .await?;
                    calls.push(tool_call);
                }
                // Complete calls arrive separately
                StreamChunk::ToolCallDelta { .. } => {}
            }
        }

        Ok((text, calls))
    }

    /// Invoke each call on its owning server, in emitted order
    async fn dispatch<S>(&self, calls: &[ToolCall], sink: &mut S) -> ChatResult<Vec<ToolResult>>
    where
        S: Sink<ResponseFragment> + Unpin,
    {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let result = self.invoke(call).await;
            emit(
                sink,
                ResponseFragment::ToolResult {
                    call_id: result.call_id.clone(),
                    name: call.name.clone(),
                    content: result.content.clone(),
                    is_error: result.is_error,
                },
            )
            .await?;
            results.push(result);
        }

        Ok(results)
    }

    /// Every failure becomes a failed tool result for the model to see
    async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let handle = self
            .namespace
            .owner(&call.name)
            .and_then(|server_id| self.scope.handle(server_id));

        let Some(handle) = handle else {
            self.logger.warn(&format!("[ChatLoop] model called unknown tool '{}'", call.name));
            return ToolResult::error(&call.id, format!("Unknown tool: {}", call.name));
        };

        match handle
            .invoke_before(&call.name, call.input.clone(), self.tool_deadline)
            .await
        {
            Ok(output) if output.is_error => ToolResult::error(&call.id, output.content),
            Ok(output) => ToolResult::success(&call.id, output.content),
            Err(e) => {
                self.logger.warn(&format!("[ChatLoop] {}", e));
                ToolResult::error(&call.id, e.to_string())
            }
        }
    }
}

async fn emit<S>(sink: &mut S, fragment: ResponseFragment) -> ChatResult<()>
where
    S: Sink<ResponseFragment> + Unpin,
{
    sink.send(fragment).await.map_err(|_| ChatError::Disconnected)
}
