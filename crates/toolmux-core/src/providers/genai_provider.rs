//! GenaiProvider - Unified provider using the genai crate
//!
//! Handles every genai-supported backend (OpenAI, Anthropic, Gemini, ...) as
//! well as OpenAI-compatible services (Azure, OpenRouter, Mistral) via the
//! ServiceTargetResolver.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::Arc;

use genai::chat::{ChatRequest, ChatStreamEvent};

use crate::logging::Logger;
use crate::types::{CancellationToken, ChatMessage};

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, from_genai_event, is_genai_supported, to_genai_messages, to_genai_options,
    to_genai_tools, ProviderConfig,
};
use super::traits::{Provider, ProviderModelConfig, StreamChatOptions, StreamResponse};

/// Provider id that routes purely on the model string
pub const AUTO_PROVIDER: &str = "auto";

/// Unified provider using genai for all supported LLM APIs
pub struct GenaiProvider {
    /// Provider used when the model carries no `provider/` prefix
    provider_id: String,
    logger: Arc<dyn Logger>,
}

impl GenaiProvider {
    pub fn new(provider_id: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self {
            provider_id: provider_id.into(),
            logger,
        }
    }

    /// Check if this provider can handle the given provider ID
    pub fn supports(provider_id: &str) -> bool {
        provider_id == AUTO_PROVIDER || is_genai_supported(provider_id)
    }

    /// Extract model name from a model string (e.g., "openai/gpt-4" -> "gpt-4")
    pub fn extract_model_name(model: &str) -> &str {
        model.split_once('/').map(|(_, name)| name).unwrap_or(model)
    }
}

#[async_trait]
impl Provider for GenaiProvider {
    fn name(&self) -> &str {
        &self.provider_id
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model_config: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        let config = ProviderConfig::for_request(&self.provider_id, &model_config);
        if !Self::supports(&config.provider) {
            return Err(ProviderError::Unsupported(config.provider));
        }

        let model_name = Self::extract_model_name(&model_config.model);
        self.logger.info(&format!(
            "[GenaiProvider] stream_chat: provider={}, model={}, messages={}",
            config.provider,
            model_name,
            messages.len()
        ));

        let client = create_client(&config);

        let mut chat_req = ChatRequest::new(to_genai_messages(messages));
        if let Some(tools) = &options.tools {
            chat_req = chat_req.with_tools(to_genai_tools(tools.clone()));
        }
        let genai_options = to_genai_options(&options);

        let chat_stream = client
            .exec_chat_stream(model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| ProviderError::api_error(config.provider.clone(), e.to_string()))?;

        self.logger.debug("[GenaiProvider] Stream started");

        let cancel = cancel_token.clone();
        let logger = Arc::clone(&self.logger);
        let provider_id = config.provider;

        let stream = chat_stream
            .stream
            .map(move |result| {
                if cancel.is_cancelled() {
                    logger.info("[GenaiProvider] Stream cancelled");
                    return vec![Err(ProviderError::Cancelled)];
                }

                match result {
                    Ok(event) => {
                        match &event {
                            ChatStreamEvent::ToolCallChunk(_) => {
                                logger.debug("[GenaiProvider] Stream event: ToolCallChunk");
                            }
                            ChatStreamEvent::End(_) => {
                                logger.debug("[GenaiProvider] Stream event: End");
                            }
                            _ => {}
                        }
                        from_genai_event(event)
                    }
                    Err(e) => {
                        logger.error(&format!("[GenaiProvider] Stream error: {}", e));
                        vec![Err(ProviderError::api_error(provider_id.clone(), e.to_string()))]
                    }
                }
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}
