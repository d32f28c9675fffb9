//! Network collaborator: one request, one reply.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::ExchangeError;
use crate::protocol::{ChatReply, ChatRequest};

/// Request/response message endpoint.
#[async_trait]
pub trait MessageEndpoint: Send + Sync + std::fmt::Debug {
    /// Deliver one user message and return the decoded reply.
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatReply, ExchangeError>;
}

/// JSON-over-HTTP endpoint.
///
/// # Example
///
/// ```rust,no_run
/// use gharfix_widget::transport::HttpEndpoint;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let endpoint = HttpEndpoint::new("https://gharfix-chatbot.onrender.com/chat".parse()?)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    url: Url,
    http: reqwest::Client,
}

impl HttpEndpoint {
    /// Create an endpoint with a default client.
    pub fn new(url: Url) -> Result<Self, reqwest::Error> {
        Self::with_timeout(url, Duration::from_secs(30))
    }

    /// Create an endpoint whose requests give up after `timeout`.
    pub fn with_timeout(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, http })
    }

    /// Create an endpoint with a custom reqwest client.
    #[must_use]
    pub fn with_client(url: Url, http: reqwest::Client) -> Self {
        Self { url, http }
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn handle_response(response: reqwest::Response) -> Result<ChatReply, ExchangeError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ExchangeError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MessageEndpoint for HttpEndpoint {
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatReply, ExchangeError> {
        tracing::debug!(
            name: "widget.http.request",
            url = %self.url,
            conversation_id = %request.conversation_id,
            "Posting chat message"
        );

        let response = self
            .http
            .post(self.url.clone())
            .json(request)
            .send()
            .await?;
        Self::handle_response(response).await
    }
}
