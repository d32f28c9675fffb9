use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use gharfix_widget::config::WidgetConfig;
use gharfix_widget::conversation::ConversationId;
use gharfix_widget::error::ExchangeError;
use gharfix_widget::protocol::ChatRequest;
use gharfix_widget::storage::MemoryStore;
use gharfix_widget::transport::{HttpEndpoint, MessageEndpoint};
use gharfix_widget::widget::{ChatWidget, ExchangeOutcome};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

// Stand-in for the chat backend: behavior keyed off the message text.
async fn fake_chat(Json(body): Json<Value>) -> axum::response::Response {
    let message = body["message"].as_str().unwrap_or_default().to_string();
    let conversation_id = body["conversation_id"].as_str().unwrap_or_default().to_string();

    match message.as_str() {
        "fail" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "garbage" => (StatusCode::OK, "definitely not json").into_response(),
        "silent" => Json(json!({ "conversation_id": conversation_id })).into_response(),
        "whatsapp" => Json(json!({
            "response": "WHATSAPP_REDIRECT:https://wa.me/917506855407",
            "conversation_id": conversation_id,
            "status": "success"
        }))
        .into_response(),
        _ => Json(json!({
            "response": format!("You said: {message}\n(conversation {conversation_id})"),
            "conversation_id": conversation_id,
            "status": "success"
        }))
        .into_response(),
    }
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new().route("/chat", post(fake_chat));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn request(message: &str) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        conversation_id: ConversationId::from("cid-1700000000000-42".to_string()),
    }
}

fn endpoint(addr: SocketAddr) -> HttpEndpoint {
    HttpEndpoint::new(format!("http://{addr}/chat").parse().unwrap()).unwrap()
}

#[tokio::test]
async fn test_http_exchange_round_trip() {
    let addr = spawn_backend().await;
    let reply = endpoint(addr).exchange(&request("Pricing")).await.unwrap();

    assert_eq!(
        reply.response.as_deref(),
        Some("You said: Pricing\n(conversation cid-1700000000000-42)")
    );
}

#[tokio::test]
async fn test_http_error_status() {
    let addr = spawn_backend().await;
    let err = endpoint(addr).exchange(&request("fail")).await.unwrap_err();

    assert!(matches!(err, ExchangeError::Status { status: 500 }));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_http_undecodable_body() {
    let addr = spawn_backend().await;
    let err = endpoint(addr).exchange(&request("garbage")).await.unwrap_err();

    assert!(matches!(err, ExchangeError::Decode(_)));
}

#[tokio::test]
async fn test_http_missing_reply_field() {
    let addr = spawn_backend().await;
    let reply = endpoint(addr).exchange(&request("silent")).await.unwrap();

    assert!(reply.response.is_none());
}

#[tokio::test]
async fn test_http_connection_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = endpoint(addr).exchange(&request("hello")).await.unwrap_err();
    assert!(matches!(err, ExchangeError::Network(_)));
}

#[tokio::test]
async fn test_widget_against_http_backend() {
    let addr = spawn_backend().await;
    let mut config = WidgetConfig::default();
    config.api_base = format!("http://{addr}");
    config.timing.welcome_delay_ms = 60_000;

    let widget = ChatWidget::builder(config)
        .store(Arc::new(MemoryStore::new()))
        .build()
        .unwrap();

    assert_eq!(widget.send_message("Book Now").await, ExchangeOutcome::Replied);
    assert_eq!(widget.send_message("fail").await, ExchangeOutcome::Failed);
    assert_eq!(widget.send_message("silent").await, ExchangeOutcome::Fallback);
    assert!(matches!(
        widget.send_message("whatsapp").await,
        ExchangeOutcome::Redirected { .. }
    ));

    let messages = widget.messages();
    assert_eq!(
        messages[1].text,
        format!("You said: Book Now\n(conversation {})", widget.conversation_id())
    );
    assert_eq!(messages.len(), 8);
}
