//! Token gateway client.
//!
//! The gateway holds the client secret and talks to the provider's token
//! endpoint on our behalf. The flow only sees the [`TokenGateway`] trait.

use crate::error::{AuthError, AuthResult};
use crate::types::{OAuthConfig, TokenResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Path of the gateway's token route.
pub const TOKEN_ROUTE: &str = "/api/auth/token";

/// Exchanges codes and refresh tokens for token responses.
#[async_trait]
pub trait TokenGateway: Send + Sync {
    /// `grant_type=authorization_code` with the PKCE verifier.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        config: &OAuthConfig,
    ) -> AuthResult<TokenResponse>;

    /// `grant_type=refresh_token`.
    async fn refresh_token(
        &self,
        refresh_token: &str,
        config: &OAuthConfig,
    ) -> AuthResult<TokenResponse>;
}

/// Body of `POST /api/auth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub code: Option<String>,
    pub code_verifier: Option<String>,
    pub config: Option<OAuthConfig>,
}

/// Body of `PUT /api/auth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
    pub config: Option<OAuthConfig>,
}

/// Error envelope returned by the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// The most specific message available: details, then error.
    pub fn message(&self) -> Option<&str> {
        self.details
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(self.error.as_deref())
    }
}

/// [`TokenGateway`] reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTokenGateway {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpTokenGateway {
    /// `base_url` is the gateway origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> AuthResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> AuthResult<Self> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(TOKEN_ROUTE))
            .map_err(|e| AuthError::invalid_config(format!("gateway URL is invalid: {e}")))?;
        Ok(Self { http, endpoint })
    }

    async fn read_reply(
        response: reqwest::Response,
        failure: fn(u16, String) -> AuthError,
    ) -> AuthResult<TokenResponse> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|env| env.message().map(str::to_string))
                .unwrap_or(text);
            return Err(failure(status.as_u16(), detail));
        }

        serde_json::from_str(&text).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TokenGateway for HttpTokenGateway {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        config: &OAuthConfig,
    ) -> AuthResult<TokenResponse> {
        debug!(endpoint = %self.endpoint, "Exchanging authorization code via gateway");
        let body = ExchangeRequest {
            code: Some(code.to_string()),
            code_verifier: Some(code_verifier.to_string()),
            config: Some(config.clone()),
        };
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        Self::read_reply(response, |status, detail| {
            AuthError::exchange_failed(status, detail)
        })
        .await
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
        config: &OAuthConfig,
    ) -> AuthResult<TokenResponse> {
        debug!(endpoint = %self.endpoint, "Refreshing tokens via gateway");
        let body = RefreshRequest {
            refresh_token: Some(refresh_token.to_string()),
            config: Some(config.clone()),
        };
        let response = self
            .http
            .put(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        Self::read_reply(response, |status, detail| {
            AuthError::refresh_failed(status, detail)
        })
        .await
    }
}
