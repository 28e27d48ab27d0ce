//! OAuth configuration and token types.

use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default redirect URI, served by the gateway's callback route.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/api/auth/callback";

/// Scopes requested when the configuration names none.
pub const DEFAULT_SCOPES: &[&str] = &["openid", "profile", "email"];

/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Identity provider flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Okta,
    Auth0,
    #[default]
    Custom,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderKind::Okta => "okta",
            ProviderKind::Auth0 => "auth0",
            ProviderKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Settings for one authorization code + PKCE round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

impl OAuthConfig {
    /// Create a config with default redirect URI and scopes.
    pub fn new(
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            provider: ProviderKind::default(),
            issuer: String::new(),
            authorization_endpoint: authorization_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
        }
    }

    /// Check that every field the flow depends on is present and well formed.
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::invalid_config("clientId is required"));
        }
        parse_url("authorizationEndpoint", &self.authorization_endpoint)?;
        parse_url("tokenEndpoint", &self.token_endpoint)?;
        parse_url("redirectUri", &self.redirect_uri)?;
        Ok(())
    }

    /// Scopes joined the way the authorization endpoint expects them.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

fn parse_url(field: &str, value: &str) -> AuthResult<Url> {
    if value.trim().is_empty() {
        return Err(AuthError::invalid_config(format!("{field} is required")));
    }
    Url::parse(value).map_err(|e| AuthError::invalid_config(format!("{field} is invalid: {e}")))
}

/// The live credential set. Exactly one is stored at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Absolute expiry, stored as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_display: Option<String>,
}

impl TokenSet {
    /// Whether the token is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn time_until_expiry_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the token expires within `threshold` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.time_until_expiry_at(now) < threshold
    }
}

/// Raw token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Lifetime in seconds, falling back to one hour when missing or zero.
    pub fn lifetime_secs(&self) -> u64 {
        self.expires_in
            .filter(|&secs| secs > 0)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
    }

    /// Absolute expiry for a response received at `now`.
    ///
    /// Lifetimes past the last representable instant saturate to it.
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        i64::try_from(self.lifetime_secs())
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn token_type_or_default(&self) -> String {
        self.token_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Bearer".to_string())
    }
}
