//! Authentication error types.

use mcpscope_storage::StorageError;
use thiserror::Error;

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised by the credential store and the OAuth flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed configuration. Not retried.
    #[error("Invalid OAuth configuration: {0}")]
    InvalidConfig(String),

    /// Non-success response from the token gateway or provider.
    #[error("{operation} failed: {detail}")]
    Provider {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// The callback `state` did not match the stored CSRF state.
    #[error("Invalid state parameter, possible CSRF attack")]
    StateMismatch,

    /// No PKCE code verifier is stored for this attempt.
    #[error("No PKCE code verifier found")]
    MissingVerifier,

    /// No OAuth configuration is stored for this attempt.
    #[error("No OAuth configuration found for this authorization attempt")]
    MissingConfig,

    /// The callback did not carry the expected parameters.
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    /// The provider redirected back with an error.
    #[error("Authorization failed: {0}")]
    AuthorizationDenied(String),

    /// Refresh requested without a refresh token.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// No token set is stored.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The token response could not be understood.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Transport failure talking to the gateway or provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuthError {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a provider error for a failed code exchange.
    pub fn exchange_failed(status: u16, detail: impl Into<String>) -> Self {
        Self::Provider {
            operation: "Token exchange",
            status,
            detail: detail.into(),
        }
    }

    /// Create a provider error for a failed refresh.
    pub fn refresh_failed(status: u16, detail: impl Into<String>) -> Self {
        Self::Provider {
            operation: "Token refresh",
            status,
            detail: detail.into(),
        }
    }

    /// HTTP status carried by a provider error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
