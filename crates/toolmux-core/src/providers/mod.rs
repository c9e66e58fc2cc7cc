//! Model providers
//!
//! ## Architecture
//!
//! All real backends go through the `genai` crate, which handles:
//! - Streaming SSE parsing
//! - Provider-specific protocols (OpenAI, Anthropic, Gemini, etc.)
//! - Tool calling
//!
//! Services not native to genai (Azure, OpenRouter, Mistral) are routed via
//! genai's `ServiceTargetResolver` using the OpenAI-compatible protocol.
//!
//! `MockProvider` scripts model turns, including tool calls, for tests and
//! for running the server without credentials.

mod traits;
mod error;
mod genai_adapter;
mod genai_provider;
mod mock;

pub use traits::{Provider, ProviderModelConfig, StreamChatOptions, StreamResponse};
pub use error::{ProviderError, ProviderResult};

pub use genai_provider::{GenaiProvider, AUTO_PROVIDER};
pub use genai_adapter::{is_genai_native, is_genai_supported, ProviderConfig};

pub use mock::{MockConfig, MockMode, MockProvider, MockRequest, MockTurn};

use crate::logging::Logger;
use std::sync::Arc;

/// Create a provider for the given provider ID
///
/// `mock` gives an echoing [`MockProvider`]; anything genai can route gives a
/// [`GenaiProvider`].
pub fn create_provider(provider_id: &str, logger: Arc<dyn Logger>) -> ProviderResult<Arc<dyn Provider>> {
    let id = provider_id.to_lowercase();
    match id.as_str() {
        "mock" => Ok(Arc::new(MockProvider::echo(logger))),
        _ if GenaiProvider::supports(&id) => Ok(Arc::new(GenaiProvider::new(id, logger))),
        _ => Err(ProviderError::Unsupported(provider_id.to_string())),
    }
}

/// List all supported provider IDs
pub fn supported_providers() -> Vec<&'static str> {
    vec![
        AUTO_PROVIDER,
        // Native genai providers
        "openai",
        "anthropic",
        "gemini",
        "ollama",
        "groq",
        "xai",
        "deepseek",
        "cohere",
        "fireworks",
        "together",
        // OpenAI-compatible providers via resolver
        "azure",
        "openrouter",
        "mistral",
        // Testing
        "mock",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_create_provider() {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        assert_eq!(create_provider("mock", logger.clone()).unwrap().name(), "mock");
        assert_eq!(create_provider("Anthropic", logger.clone()).unwrap().name(), "anthropic");
        assert!(matches!(
            create_provider("carrier-pigeon", logger),
            Err(ProviderError::Unsupported(_))
        ));
    }

    #[test]
    fn test_every_listed_provider_can_be_created() {
        for id in supported_providers() {
            assert!(create_provider(id, Arc::new(NoOpLogger)).is_ok(), "{}", id);
        }
    }
}
