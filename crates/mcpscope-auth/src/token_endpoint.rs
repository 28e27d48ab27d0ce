//! Direct calls to a provider's token endpoint.
//!
//! Confidential clients authenticate with HTTP Basic `client_id:secret`;
//! public clients send `client_id` as a form parameter instead.

use crate::error::{AuthError, AuthResult};
use crate::gateway::TokenGateway;
use crate::types::{OAuthConfig, TokenResponse};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

/// A grant sent to the token endpoint.
#[derive(Debug, Clone, Copy)]
pub enum TokenGrant<'a> {
    AuthorizationCode {
        code: &'a str,
        code_verifier: &'a str,
    },
    RefreshToken {
        refresh_token: &'a str,
    },
}

impl TokenGrant<'_> {
    pub fn grant_type(&self) -> &'static str {
        match self {
            TokenGrant::AuthorizationCode { .. } => "authorization_code",
            TokenGrant::RefreshToken { .. } => "refresh_token",
        }
    }

    fn failure(&self, status: u16, detail: String) -> AuthError {
        match self {
            TokenGrant::AuthorizationCode { .. } => AuthError::exchange_failed(status, detail),
            TokenGrant::RefreshToken { .. } => AuthError::refresh_failed(status, detail),
        }
    }
}

/// Token endpoint client holding the optional server-side client secret.
#[derive(Clone)]
pub struct TokenEndpointClient {
    http: reqwest::Client,
    client_secret: Option<String>,
}

impl std::fmt::Debug for TokenEndpointClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEndpointClient")
            .field("confidential", &self.is_confidential())
            .finish()
    }
}

impl TokenEndpointClient {
    pub fn new(client_secret: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), client_secret)
    }

    pub fn with_client(http: reqwest::Client, client_secret: Option<String>) -> Self {
        Self {
            http,
            client_secret: client_secret.filter(|s| !s.is_empty()),
        }
    }

    /// Whether a client secret is configured.
    pub fn is_confidential(&self) -> bool {
        self.client_secret.is_some()
    }

    /// Perform `grant` against `config.token_endpoint` and return the raw
    /// provider response.
    ///
    /// Non-success responses become [`AuthError::Provider`] carrying the
    /// provider status and body text.
    pub async fn request(&self, config: &OAuthConfig, grant: TokenGrant<'_>) -> AuthResult<Value> {
        let mut params: Vec<(&str, &str)> = vec![("grant_type", grant.grant_type())];
        match grant {
            TokenGrant::AuthorizationCode {
                code,
                code_verifier,
            } => {
                params.push(("code", code));
                params.push(("redirect_uri", config.redirect_uri.as_str()));
                params.push(("code_verifier", code_verifier));
            }
            TokenGrant::RefreshToken { refresh_token } => {
                params.push(("refresh_token", refresh_token));
            }
        }

        let mut request = self.http.post(&config.token_endpoint);
        match &self.client_secret {
            Some(secret) => {
                request = request.basic_auth(&config.client_id, Some(secret));
            }
            None => {
                debug!("No client secret configured, using public client flow");
                params.push(("client_id", config.client_id.as_str()));
            }
        }

        debug!(
            endpoint = %config.token_endpoint,
            grant_type = grant.grant_type(),
            "Sending token request"
        );
        let response = request.form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), grant_type = grant.grant_type(), "Token request rejected");
            return Err(grant.failure(status.as_u16(), text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        info!(grant_type = grant.grant_type(), "Token request succeeded");
        Ok(body)
    }
}

fn parse_token_response(body: Value) -> AuthResult<TokenResponse> {
    serde_json::from_value(body).map_err(|e| AuthError::InvalidResponse(e.to_string()))
}

/// Talks to the provider in-process instead of through a gateway.
#[async_trait]
impl TokenGateway for TokenEndpointClient {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        config: &OAuthConfig,
    ) -> AuthResult<TokenResponse> {
        let body = self
            .request(
                config,
                TokenGrant::AuthorizationCode {
                    code,
                    code_verifier,
                },
            )
            .await?;
        parse_token_response(body)
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
        config: &OAuthConfig,
    ) -> AuthResult<TokenResponse> {
        let body = self
            .request(config, TokenGrant::RefreshToken { refresh_token })
            .await?;
        parse_token_response(body)
    }
}
