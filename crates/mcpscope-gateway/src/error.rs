//! Gateway error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use mcpscope_auth::AuthError;
use mcpscope_mcp::McpError;
use serde_json::{json, Value};
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors produced by gateway handlers and the server itself.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required request field is missing. Rendered as `400 {error}`.
    #[error("{0}")]
    BadRequest(&'static str),

    /// The provider or MCP endpoint answered with a non-success status.
    /// Rendered with that status and `body` as-is.
    #[error("Upstream returned {status}")]
    Upstream { status: StatusCode, body: Value },

    /// Anything else while handling a request. Rendered as
    /// `500 {error: "Internal server error", details}`.
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Failed to bind gateway: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Gateway server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl GatewayError {
    pub fn internal(details: impl Into<String>) -> Self {
        Self::Internal(details.into())
    }

    /// Status code the error renders with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Provider {
                operation,
                status,
                detail,
            } => Self::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body: json!({
                    "error": format!("{operation} failed"),
                    "details": detail,
                }),
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<McpError> for GatewayError {
    fn from(e: McpError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest(message) => json!({ "error": message }),
            Self::Upstream { body, .. } => body,
            Self::Internal(details) => json!({
                "error": "Internal server error",
                "details": details,
            }),
            other => json!({
                "error": "Internal server error",
                "details": other.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_keeps_status_and_detail() {
        let err: GatewayError = AuthError::refresh_failed(401, "invalid_grant").into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        match err {
            GatewayError::Upstream { body, .. } => {
                assert_eq!(body, json!({"error": "Token refresh failed", "details": "invalid_grant"}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err: GatewayError = AuthError::MissingVerifier.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: GatewayError = McpError::decode("Invalid SSE format: no data line found").into();
        assert_eq!(
            err.to_string(),
            "Internal server error: Decode error: Invalid SSE format: no data line found"
        );
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(
            GatewayError::BadRequest("MCP endpoint is required").status(),
            StatusCode::BAD_REQUEST
        );
    }
}
