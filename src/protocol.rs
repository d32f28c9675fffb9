//! Wire contract with the chat endpoint and reply classification.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::conversation::ConversationId;
use crate::error::ExchangeError;

/// Reply prefix asking the client to open an external messaging link.
pub const REDIRECT_MARKER: &str = "WHATSAPP_REDIRECT:";

/// Body of `POST <endpoint>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
}

/// Success body returned by the endpoint. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Bot reply text, possibly carrying [`REDIRECT_MARKER`].
    #[serde(default)]
    pub response: Option<String>,
}

/// What the widget should do with a successful reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Show the text as a bot bubble.
    Text(String),
    /// Confirm, then open the link externally.
    Redirect(Url),
}

impl Reply {
    /// Classify a decoded reply.
    ///
    /// # Errors
    ///
    /// [`ExchangeError::EmptyReply`] when the field is missing or blank, and
    /// [`ExchangeError::InvalidRedirect`] when the marker is followed by
    /// something that is not an absolute `http`/`https` URL.
    pub fn classify(reply: ChatReply) -> Result<Self, ExchangeError> {
        let text = reply
            .response
            .filter(|r| !r.trim().is_empty())
            .ok_or(ExchangeError::EmptyReply)?;

        match text.strip_prefix(REDIRECT_MARKER) {
            Some(target) => {
                let target = target.trim();
                let url = Url::parse(target)
                    .map_err(|e| ExchangeError::InvalidRedirect(format!("{target}: {e}")))?;
                match url.scheme() {
                    "http" | "https" => Ok(Self::Redirect(url)),
                    scheme => Err(ExchangeError::InvalidRedirect(format!(
                        "{target}: unsupported scheme {scheme}"
                    ))),
                }
            }
            None => Ok(Self::Text(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: Option<&str>) -> ChatReply {
        ChatReply {
            response: text.map(str::to_string),
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let req = ChatRequest {
            message: "Pricing".into(),
            conversation_id: ConversationId::from("cid-1-2".to_string()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"message": "Pricing", "conversation_id": "cid-1-2"})
        );
    }

    #[test]
    fn test_reply_ignores_extra_fields() {
        let parsed: ChatReply = serde_json::from_str(
            r#"{"response": "hi", "conversation_id": "cid-1-2", "status": "success"}"#,
        )
        .unwrap();
        assert_eq!(parsed.response.as_deref(), Some("hi"));

        let missing: ChatReply = serde_json::from_str("{}").unwrap();
        assert!(missing.response.is_none());
    }

    #[test]
    fn test_classify_text_keeps_newlines() {
        let r = Reply::classify(reply(Some("line one\nline two"))).unwrap();
        assert_eq!(r, Reply::Text("line one\nline two".into()));
    }

    #[test]
    fn test_classify_empty() {
        assert!(matches!(
            Reply::classify(reply(None)),
            Err(ExchangeError::EmptyReply)
        ));
        assert!(matches!(
            Reply::classify(reply(Some("   "))),
            Err(ExchangeError::EmptyReply)
        ));
    }

    #[test]
    fn test_classify_redirect() {
        let r = Reply::classify(reply(Some("WHATSAPP_REDIRECT:https://wa.me/123"))).unwrap();
        assert_eq!(r, Reply::Redirect(Url::parse("https://wa.me/123").unwrap()));
    }

    #[test]
    fn test_classify_bad_redirect() {
        assert!(matches!(
            Reply::classify(reply(Some("WHATSAPP_REDIRECT:not a link"))),
            Err(ExchangeError::InvalidRedirect(_))
        ));
    }

    #[test]
    fn test_classify_rejects_non_web_schemes() {
        for target in [
            "javascript:alert(1)",
            "data:text/html,<script>alert(1)</script>",
            "file:///etc/passwd",
        ] {
            let text = format!("WHATSAPP_REDIRECT:{target}");
            assert!(
                matches!(
                    Reply::classify(reply(Some(&text))),
                    Err(ExchangeError::InvalidRedirect(_))
                ),
                "{target} should be rejected"
            );
        }

        let r = Reply::classify(reply(Some("WHATSAPP_REDIRECT:http://wa.me/1"))).unwrap();
        assert!(matches!(r, Reply::Redirect(_)));
    }

    #[test]
    fn test_marker_must_be_a_prefix() {
        let r = Reply::classify(reply(Some("Say WHATSAPP_REDIRECT:https://wa.me/1"))).unwrap();
        assert!(matches!(r, Reply::Text(_)));
    }
}
