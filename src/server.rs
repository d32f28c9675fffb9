use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tower_http::trace::TraceLayer;

use tracing::info;

use crate::config::WidgetConfig;
use crate::links::RecordingOpener;
use crate::storage::{FileStore, KeyValueStore};
use crate::widget::{ChatWidget, ExchangeOutcome, WidgetSnapshot};

/// State shared across all handlers: one embedded widget instance.
#[derive(Debug, Clone)]
pub struct HostState {
    pub widget: ChatWidget,
    /// Links the widget asked to open; surfaced to the page via `/widget/state`.
    pub opener: RecordingOpener,
}

impl HostState {
    /// Build the widget on durable file storage described by `config`.
    pub fn from_config(config: WidgetConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.server.storage_path)?);
        let opener = RecordingOpener::new();
        let widget = ChatWidget::builder(config)
            .store(store)
            .opener(Arc::new(opener.clone()))
            .build()?;
        Ok(Self { widget, opener })
    }
}

/// Start the Axum host with the provided configuration.
pub async fn start_server(config: Arc<WidgetConfig>) -> anyhow::Result<()> {
    info!(
        name: "widget.config.loaded",
        endpoint = %config.endpoint_url()?,
        storage = %config.server.storage_path,
        "Widget configuration loaded"
    );

    let state = HostState::from_config(config.as_ref().clone())?;
    let widget = state.widget.clone();
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    widget.dispose();
    Ok(())
}

/// Build the router for an embedded widget.
pub fn router(state: HostState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/widget", get(widget_html))
        .route("/widget/state", get(widget_state))
        .route("/widget/expand", post(expand))
        .route("/widget/minimize", post(minimize))
        .route("/widget/toggle", post(toggle))
        .route("/widget/messages", post(send_message))
        .route("/widget/submit", post(submit))
        .route("/widget/quick-actions/{key}", post(quick_action))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML
// ─────────────────────────────────────────────────────────────────────────────

/// Generate the host page around the widget markup.
fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
</head>
<body>
    {content}
</body>
</html>"#,
        title = crate::dom::escape_text(title),
    )
}

/// GET / - Host page with the embedded widget.
async fn index_handler(State(state): State<HostState>) -> Html<String> {
    let title = state.widget.config().title.clone();
    Html(html_shell(&title, &state.widget.render_html()))
}

/// GET /widget - Widget fragment.
async fn widget_html(State(state): State<HostState>) -> Html<String> {
    Html(state.widget.render_html())
}

// ─────────────────────────────────────────────────────────────────────────────
// Control surface
// ─────────────────────────────────────────────────────────────────────────────

/// Widget snapshot plus host-side effects.
#[derive(Debug, Serialize)]
struct StateResponse {
    #[serde(flatten)]
    widget: WidgetSnapshot,
    opened_links: Vec<String>,
}

impl StateResponse {
    fn from_state(state: &HostState) -> Self {
        Self {
            widget: state.widget.snapshot(),
            opened_links: state
                .opener
                .opened()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExchangeResponse {
    outcome: ExchangeOutcome,
    state: StateResponse,
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    /// Replaces the input value before submitting.
    #[serde(default)]
    text: Option<String>,
}

/// GET /widget/state
async fn widget_state(State(state): State<HostState>) -> Json<StateResponse> {
    Json(StateResponse::from_state(&state))
}

/// POST /widget/expand
async fn expand(State(state): State<HostState>) -> Json<StateResponse> {
    state.widget.expand();
    Json(StateResponse::from_state(&state))
}

/// POST /widget/minimize
async fn minimize(State(state): State<HostState>) -> Json<StateResponse> {
    state.widget.minimize();
    Json(StateResponse::from_state(&state))
}

/// POST /widget/toggle
async fn toggle(State(state): State<HostState>) -> Json<StateResponse> {
    state.widget.toggle();
    Json(StateResponse::from_state(&state))
}

/// POST /widget/messages - Programmatic send.
async fn send_message(
    State(state): State<HostState>,
    Json(req): Json<SendRequest>,
) -> Json<ExchangeResponse> {
    let outcome = state.widget.send_message(&req.text).await;
    Json(ExchangeResponse {
        outcome,
        state: StateResponse::from_state(&state),
    })
}

/// POST /widget/submit - Submit the input form.
async fn submit(
    State(state): State<HostState>,
    Json(req): Json<SubmitRequest>,
) -> Json<ExchangeResponse> {
    if let Some(text) = req.text {
        state.widget.set_input(&text);
    }
    let outcome = state.widget.submit().await;
    Json(ExchangeResponse {
        outcome,
        state: StateResponse::from_state(&state),
    })
}

/// POST /widget/quick-actions/{key}
async fn quick_action(
    State(state): State<HostState>,
    Path(key): Path<String>,
) -> Result<Json<ExchangeResponse>, (StatusCode, String)> {
    let outcome = state
        .widget
        .click_quick_action(&key)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown quick action: {key}")))?;
    Ok(Json(ExchangeResponse {
        outcome,
        state: StateResponse::from_state(&state),
    }))
}
