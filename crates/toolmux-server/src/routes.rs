//! HTTP routes
//!
//! ```text
//! POST /api/chat        ChatRequest JSON  ─► SSE, one ResponseFragment per event
//! GET  /api/mcp-status                   ─► StatusReport JSON
//! ```
//!
//! A client that drops the chat stream stops the request; its connections
//! are still closed by the service.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use toolmux_core::{ChatRequest, ChatService, StatusReport, StatusReporter};

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub status: StatusReporter,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/mcp-status", get(mcp_status))
        .route("/health", get(health))
        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state.chat.chat(request).map(|fragment| {
        // Serializing a fragment cannot fail; fall back to the bare type tag
        Ok(Event::default()
            .json_data(&fragment)
            .unwrap_or_else(|_| Event::default().data("{\"type\":\"error\"}")))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn mcp_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.status.report().await)
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use toolmux_core::connection::{MockConnector, MockServer};
    use toolmux_core::providers::MockProvider;
    use toolmux_core::{Logger, MemoryServerRegistry, NoOpLogger, ServerDescriptor};
    use tower::ServiceExt;

    fn app(connector: &MockConnector, provider: MockProvider) -> Router {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        let registry = Arc::new(MemoryServerRegistry::with_servers(vec![
            ServerDescriptor::new("clock", "Clock", "A"),
            ServerDescriptor::new("math", "Math", "B"),
        ]));
        let connector = Arc::new(connector.clone());
        let status = StatusReporter::new(registry.clone(), connector.clone(), Arc::clone(&logger));
        let chat = ChatService::new(registry, connector, Arc::new(provider), logger);
        router(AppState { chat, status })
    }

    fn sse_payloads(body: &str) -> Vec<Value> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .filter_map(|data| serde_json::from_str(data.trim()).ok())
            .collect()
    }

    #[tokio::test]
    async fn test_chat_streams_fragments_as_events() {
        let connector = MockConnector::new().with_server("A", MockServer::new().with_tool("now"));
        let provider = MockProvider::fixed("It is noon.", Arc::new(NoOpLogger)).with_chunk_size(0);

        let body = json!({ "messages": [{ "role": "user", "content": "time?" }] });
        let response = app(&connector, provider)
            .oneshot(
                Request::post("/api/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/event-stream"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let events = sse_payloads(&String::from_utf8_lossy(&bytes));

        assert_eq!(events.first().unwrap()["type"], "text");
        assert_eq!(events.first().unwrap()["text"], "It is noon.");
        let last = events.last().unwrap();
        assert_eq!(last["type"], "finish");
        assert_eq!(last["reason"], "stop");

        // B is unreachable; A was opened and closed once
        assert_eq!(connector.opens("A"), 1);
        assert_eq!(connector.closes("A"), 1);
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_body() {
        let connector = MockConnector::new();
        let response = app(&connector, MockProvider::echo(Arc::new(NoOpLogger)))
            .oneshot(
                Request::post("/api/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"messages\": 42}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(connector.total_opens(), 0);
    }

    #[tokio::test]
    async fn test_status_reports_each_server() {
        let connector = MockConnector::new().with_server("A", MockServer::new().with_tool("now"));
        let response = app(&connector, MockProvider::echo(Arc::new(NoOpLogger)))
            .oneshot(Request::get("/api/mcp-status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let report: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(report["servers"][0]["id"], "clock");
        assert_eq!(report["servers"][0]["status"], "active");
        assert_eq!(report["servers"][0]["tools"][0]["name"], "now");
        assert_eq!(report["servers"][1]["status"], "error");
        assert_eq!(connector.total_opens(), connector.total_closes());
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(&MockConnector::new(), MockProvider::echo(Arc::new(NoOpLogger)))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
