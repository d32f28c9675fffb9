//! Error types for the widget.

use thiserror::Error;

/// Failure of a single message exchange with the chat endpoint.
///
/// None of these ever reach the user verbatim; the widget maps them to a
/// fixed bot bubble and logs the detail.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Endpoint answered with a non-success status.
    #[error("endpoint returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Success status but the body was not the expected JSON.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Success status but the reply field was missing or empty.
    #[error("reply was empty")]
    EmptyReply,

    /// Redirect marker carried something that is not an absolute URL.
    #[error("invalid redirect target: {0}")]
    InvalidRedirect(String),
}

impl ExchangeError {
    /// Whether this failure belongs to the transport class (status, network
    /// or decoding) as opposed to an unusable reply.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Network(_) | Self::Decode(_)
        )
    }
}

/// Durable key-value store failure.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backing file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file is not a JSON object of strings.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Widget construction and configuration error.
#[derive(Error, Debug)]
pub enum WidgetError {
    /// Persisted state could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The configured endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result type alias for widget operations.
pub type Result<T> = std::result::Result<T, WidgetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(ExchangeError::Status { status: 502 }.is_transport());
        assert!(ExchangeError::Decode("eof".into()).is_transport());
        assert!(!ExchangeError::EmptyReply.is_transport());
        assert!(!ExchangeError::InvalidRedirect("nope".into()).is_transport());
    }

    #[test]
    fn test_status_message() {
        let err = ExchangeError::Status { status: 500 };
        assert_eq!(err.to_string(), "endpoint returned status 500");
    }
}
