//! MCP error types.

use thiserror::Error;

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

/// Failures forwarding a message or reading the reply.
///
/// A non-success HTTP status is not one of these: it comes back as a
/// [`GatewayReply`](crate::GatewayReply) and the session client turns it
/// into a failure with the gateway's message.
#[derive(Debug, Error)]
pub enum McpError {
    /// The gateway or endpoint could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The reply body was neither empty, JSON, nor an event stream with a
    /// `data:` line.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Bad endpoint or gateway URL.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Request timed out")]
    Timeout,
}

impl McpError {
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

impl From<reqwest::Error> for McpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::connection_failed(e.to_string())
        } else {
            Self::Http(e)
        }
    }
}
