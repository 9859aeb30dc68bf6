//! Widget error types.

use thiserror::Error;

/// Errors raised while talking to the chat server.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Server returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The response stream broke off.
    #[error("Stream error: {0}")]
    Stream(String),
}
