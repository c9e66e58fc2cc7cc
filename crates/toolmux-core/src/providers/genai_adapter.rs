//! Adapter between toolmux types and genai types
//!
//! Tool-use parts become native genai tool calls on the assistant turn and
//! tool-result parts become native tool responses, so each backend gets the
//! tool exchange in its own wire format.

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRole as GenaiRole,
    ChatStreamEvent, ContentPart as GenaiPart, MessageContent as GenaiContent, Tool as GenaiTool,
    ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};

use crate::types::{
    ChatMessage, ContentPart, MessageContent, MessageRole, StreamChunk, Tool, ToolCall, ToolResult,
};

use super::error::ProviderError;
use super::traits::{ProviderModelConfig, StreamChatOptions};

// ============================================================================
// Message Conversion: toolmux -> genai
// ============================================================================

pub fn to_genai_role(role: MessageRole) -> GenaiRole {
    match role {
        MessageRole::System => GenaiRole::System,
        MessageRole::User => GenaiRole::User,
        MessageRole::Assistant => GenaiRole::Assistant,
        MessageRole::Tool => GenaiRole::Tool,
    }
}

pub fn to_genai_tool_call(call: ToolCall) -> GenaiToolCall {
    GenaiToolCall {
        call_id: call.id,
        fn_name: call.name,
        fn_arguments: call.input,
        thought_signatures: None,
    }
}

/// Failed results keep an `Error:` prefix; genai responses carry no error flag
pub fn to_genai_tool_response(result: ToolResult) -> GenaiToolResponse {
    if result.is_error {
        GenaiToolResponse::new(result.call_id, format!("Error: {}", result.content))
    } else {
        GenaiToolResponse::new(result.call_id, result.content)
    }
}

fn to_genai_part(part: ContentPart) -> GenaiPart {
    match part {
        ContentPart::Text { text } => GenaiPart::Text(text),
        ContentPart::ToolUse { id, name, input } => {
            GenaiPart::ToolCall(to_genai_tool_call(ToolCall { id, name, input }))
        }
        ContentPart::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => GenaiPart::ToolResponse(to_genai_tool_response(ToolResult {
            call_id: tool_use_id,
            content,
            is_error,
        })),
    }
}

/// Convert a ChatMessage to a genai ChatMessage
pub fn to_genai_message(msg: ChatMessage) -> GenaiMessage {
    let content = match msg.content {
        MessageContent::Text(text) => GenaiContent::from(text),
        MessageContent::Parts(parts) => {
            GenaiContent::from_parts(parts.into_iter().map(to_genai_part).collect::<Vec<_>>())
        }
    };

    GenaiMessage {
        role: to_genai_role(msg.role),
        content,
        options: None,
    }
}

pub fn to_genai_messages(messages: Vec<ChatMessage>) -> Vec<GenaiMessage> {
    messages.into_iter().map(to_genai_message).collect()
}

// ============================================================================
// Tool Conversion: toolmux -> genai
// ============================================================================

pub fn to_genai_tool(tool: Tool) -> GenaiTool {
    let mut genai_tool = GenaiTool::new(&tool.name);
    if !tool.description.is_empty() {
        genai_tool = genai_tool.with_description(&tool.description);
    }
    if let Some(schema) = tool.input_schema {
        genai_tool = genai_tool.with_schema(schema);
    }
    genai_tool
}

pub fn to_genai_tools(tools: Vec<Tool>) -> Vec<GenaiTool> {
    tools.into_iter().map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion: toolmux -> genai
// ============================================================================

pub fn to_genai_options(options: &StreamChatOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    // Complete tool calls arrive on the End event
    genai_opts.with_capture_tool_calls(true)
}

// ============================================================================
// Response Conversion: genai -> toolmux
// ============================================================================

pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    ToolCall {
        id: tc.call_id.clone(),
        name: tc.fn_name.clone(),
        input: tc.fn_arguments.clone(),
    }
}

/// Convert one genai stream event into zero or more chunks
///
/// The End event carries every captured tool call; each becomes its own
/// chunk, in the order the model emitted them.
pub fn from_genai_event(event: ChatStreamEvent) -> Vec<Result<StreamChunk, ProviderError>> {
    match event {
        ChatStreamEvent::Chunk(chunk) if chunk.content.is_empty() => Vec::new(),
        ChatStreamEvent::Chunk(chunk) => vec![Ok(StreamChunk::Text {
            text: chunk.content,
        })],
        ChatStreamEvent::ToolCallChunk(chunk) => vec![Ok(StreamChunk::ToolCallDelta {
            id: chunk.tool_call.call_id,
            name: Some(chunk.tool_call.fn_name),
            input_delta: Some(chunk.tool_call.fn_arguments.to_string()),
        })],
        ChatStreamEvent::End(end) => match end.captured_tool_calls() {
            Some(tool_calls) => tool_calls
                .iter()
                .map(|tc| Ok(StreamChunk::tool_call(from_genai_tool_call(tc))))
                .collect(),
            None => Vec::new(),
        },
        ChatStreamEvent::Start => Vec::new(),
        ChatStreamEvent::ReasoningChunk(_) => Vec::new(),
        ChatStreamEvent::ThoughtSignatureChunk(_) => Vec::new(),
    }
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// Provider configuration for routing
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Provider identifier (e.g., "anthropic", "openrouter")
    pub provider: String,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
}

impl ProviderConfig {
    /// Routing for a request: an explicit `provider/` model prefix wins
    /// over the provider the client was created for
    pub fn for_request(default_provider: &str, config: &ProviderModelConfig) -> Self {
        let provider = match config.model.split_once('/') {
            Some((prefix, _)) => prefix,
            None => default_provider,
        };
        Self {
            provider: provider.to_lowercase(),
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
        }
    }
}

// ============================================================================
// Client Creation
// ============================================================================

/// Create a genai Client for one request
///
/// An explicit API key is used as is; otherwise genai's default lookup
/// (provider environment variables) applies. OpenAI-compatible services
/// outside genai's native set are routed by endpoint.
pub fn create_client(config: &ProviderConfig) -> Client {
    let mut builder = Client::builder();

    if let Some(key) = config.api_key.clone() {
        let auth_resolver = AuthResolver::from_resolver_fn(
            move |_model_iden: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(key.clone())))
            },
        );
        builder = builder.with_auth_resolver(auth_resolver);
    }

    let target_provider = config.provider.clone();
    let target_api_base = config.api_base.clone();
    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let endpoint = match target_provider.as_str() {
                "azure" => target_api_base
                    .as_ref()
                    .map(|u| Endpoint::from_owned(u.clone()))
                    .unwrap_or_else(|| Endpoint::from_static("https://your-resource.openai.azure.com/")),
                "openrouter" => Endpoint::from_static("https://openrouter.ai/api/v1/"),
                "mistral" => Endpoint::from_static("https://api.mistral.ai/v1/"),
                // Native genai providers resolve normally
                _ => return Ok(target),
            };

            let model = ModelIden::new(AdapterKind::OpenAI, target.model.model_name.clone());
            Ok(ServiceTarget {
                endpoint,
                auth: target.auth,
                model,
            })
        },
    );

    builder.with_service_target_resolver(target_resolver).build()
}

/// Check if a provider is natively supported by genai
pub fn is_genai_native(provider: &str) -> bool {
    matches!(
        provider.to_lowercase().as_str(),
        "openai"
            | "anthropic"
            | "gemini"
            | "ollama"
            | "groq"
            | "xai"
            | "deepseek"
            | "cohere"
            | "fireworks"
            | "together"
    )
}

/// Check if a provider can be handled by genai (native or via OpenAI-compat)
pub fn is_genai_supported(provider: &str) -> bool {
    is_genai_native(provider)
        || matches!(provider.to_lowercase().as_str(), "azure" | "openrouter" | "mistral")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_conversion() {
        assert!(matches!(to_genai_role(MessageRole::System), GenaiRole::System));
        assert!(matches!(to_genai_role(MessageRole::Tool), GenaiRole::Tool));
        assert!(matches!(to_genai_role(MessageRole::Assistant), GenaiRole::Assistant));
    }

    #[test]
    fn test_tool_calls_become_native_parts() {
        let call = ToolCall::new("c1", "now", json!({ "tz": "UTC" }));
        let genai_msg = to_genai_message(ChatMessage::assistant_tool_calls("Let me check", &[call]));

        assert!(matches!(genai_msg.role, GenaiRole::Assistant));
        assert_eq!(genai_msg.content.texts(), vec!["Let me check"]);
        let calls = genai_msg.content.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].call_id, "c1");
        assert_eq!(calls[0].fn_name, "now");
        assert_eq!(calls[0].fn_arguments, json!({ "tz": "UTC" }));
    }

    #[test]
    fn test_tool_results_become_native_responses() {
        let genai_msg = to_genai_message(ChatMessage::tool_results(&[
            ToolResult::success("c1", "12:00"),
            ToolResult::error("c2", "timeout"),
        ]));

        assert!(matches!(genai_msg.role, GenaiRole::Tool));
        assert!(!genai_msg.content.contains_text());
        let responses = genai_msg.content.tool_responses();
        assert_eq!(responses.len(), 2);
        assert_eq!((responses[0].call_id.as_str(), responses[0].content.as_str()), ("c1", "12:00"));
        assert_eq!((responses[1].call_id.as_str(), responses[1].content.as_str()), ("c2", "Error: timeout"));
    }

    #[test]
    fn test_plain_text_message() {
        let genai_msg = to_genai_message(ChatMessage::user("hi"));
        assert!(matches!(genai_msg.role, GenaiRole::User));
        assert_eq!(genai_msg.content.first_text(), Some("hi"));
    }

    #[test]
    fn test_tool_conversion() {
        let tool = Tool::new("get_weather", "Get weather for a location").with_schema(json!({
            "type": "object",
            "properties": { "location": { "type": "string" } }
        }));

        let genai_tool = to_genai_tool(tool);
        assert_eq!(genai_tool.name, "get_weather");
    }

    #[test]
    fn test_request_routing() {
        let config = ProviderModelConfig::new("openrouter/meta-llama/llama-3-70b");
        assert_eq!(ProviderConfig::for_request("anthropic", &config).provider, "openrouter");

        let config = ProviderModelConfig::new("claude-3-5-haiku-latest").with_api_key("k");
        let routed = ProviderConfig::for_request("Anthropic", &config);
        assert_eq!(routed.provider, "anthropic");
        assert_eq!(routed.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_provider_detection() {
        assert!(is_genai_native("openai"));
        assert!(is_genai_native("anthropic"));
        assert!(!is_genai_native("azure"));

        assert!(is_genai_supported("azure"));
        assert!(is_genai_supported("openrouter"));
        assert!(!is_genai_supported("unknown_provider"));
    }
}
