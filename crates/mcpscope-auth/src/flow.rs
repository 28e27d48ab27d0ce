//! OAuth 2.0 authorization code flow with PKCE.
//!
//! `begin_authorization` prepares an attempt and returns the URL the user
//! must visit. The provider redirects back with `code` and `state`, which go
//! to `handle_callback`. That validates the state, guards against the same
//! code being processed twice, and exchanges the code through the
//! [`TokenGateway`].

use crate::claims::resolve_display_identity;
use crate::error::{AuthError, AuthResult};
use crate::gateway::TokenGateway;
use crate::pkce::{generate_state, PkceChallenge, CODE_CHALLENGE_METHOD};
use crate::store::CredentialStore;
use crate::types::{OAuthConfig, TokenSet};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Where to send the user to authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Query parameters delivered to the application entry after the redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse from a raw query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }
}

/// Result of a callback that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The code was exchanged and the token set stored.
    Authenticated(TokenSet),
    /// The code was already handed to an exchange. Nothing was done.
    AlreadyProcessed,
}

/// Drives authorization, code exchange and refresh.
pub struct OAuthFlow {
    store: Arc<CredentialStore>,
    gateway: Arc<dyn TokenGateway>,
    callback_lock: Mutex<()>,
}

impl OAuthFlow {
    pub fn new(store: Arc<CredentialStore>, gateway: Arc<dyn TokenGateway>) -> Self {
        Self {
            store,
            gateway,
            callback_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Start an attempt: store a fresh verifier, CSRF state and the config,
    /// then build the authorization URL.
    pub async fn begin_authorization(&self, config: &OAuthConfig) -> AuthResult<AuthorizationRequest> {
        config.validate()?;

        let pkce = PkceChallenge::generate();
        let state = generate_state();

        self.store.save_pkce_verifier(&pkce.verifier).await?;
        self.store.save_csrf_state(&state).await?;
        self.store.save_config(config).await?;

        let url = authorization_url(config, &pkce.challenge, &state)?;
        info!(
            provider = %config.provider,
            client_id = %config.client_id,
            "Prepared authorization request"
        );

        Ok(AuthorizationRequest { url, state })
    }

    /// Validate the redirect and exchange the code.
    ///
    /// A code that was already handed to an exchange returns
    /// [`CallbackOutcome::AlreadyProcessed`] without touching the gateway.
    pub async fn handle_callback(&self, params: CallbackParams) -> AuthResult<CallbackOutcome> {
        if let Some(error) = params.error {
            let message = params
                .error_description
                .filter(|d| !d.is_empty())
                .unwrap_or(error);
            warn!(error = %message, "Provider returned an authorization error");
            return Err(AuthError::AuthorizationDenied(message));
        }

        let (code, state) = match (params.code, params.state) {
            (Some(code), Some(state)) if !code.is_empty() && !state.is_empty() => (code, state),
            _ => {
                return Err(AuthError::InvalidCallback(
                    "Missing code or state parameter".to_string(),
                ))
            }
        };

        // Serializes duplicate deliveries so the guard check and write are atomic
        let _guard = self.callback_lock.lock().await;

        if self.store.processed_code().await.as_deref() == Some(code.as_str()) {
            debug!("Authorization code already processed, skipping");
            return Ok(CallbackOutcome::AlreadyProcessed);
        }

        let stored_state = self.store.get_csrf_state().await.unwrap_or_default();
        if !bool::from(stored_state.as_bytes().ct_eq(state.as_bytes())) {
            warn!("OAuth state mismatch");
            return Err(AuthError::StateMismatch);
        }

        let config = self.store.get_config().await.ok_or(AuthError::MissingConfig)?;

        self.store.remember_code(&code).await?;

        let result = self.exchange_code(&code, &config).await;
        if result.is_err() {
            // Let the user retry with a new attempt
            self.store.forget_code().await?;
        }
        if let Err(e) = self.store.remove_csrf_state().await {
            warn!(error = %e, "Failed to clear CSRF state");
        }

        result.map(CallbackOutcome::Authenticated)
    }

    /// Exchange `code` using the stored verifier. The verifier is removed
    /// whether or not the exchange succeeds.
    pub async fn exchange_code(&self, code: &str, config: &OAuthConfig) -> AuthResult<TokenSet> {
        let verifier = self
            .store
            .get_pkce_verifier()
            .await
            .ok_or(AuthError::MissingVerifier)?;

        let result = self.gateway.exchange_code(code, &verifier, config).await;
        self.store.remove_pkce_verifier().await?;
        let response = result?;

        let user_display =
            resolve_display_identity(response.id_token.as_deref(), &response.access_token);
        let tokens = TokenSet {
            expires_at: response.expires_at(self.store.now()),
            token_type: response.token_type_or_default(),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            user_display,
        };

        self.store.save_tokens(&tokens).await?;
        info!(
            user = tokens.user_display.as_deref().unwrap_or("unknown"),
            expires_at = %tokens.expires_at,
            "Authenticated"
        );
        Ok(tokens)
    }

    /// Refresh with an explicit refresh token.
    ///
    /// Keeps the previous refresh token when the response omits one, and
    /// always keeps the previously resolved display identity.
    pub async fn refresh_token(
        &self,
        config: &OAuthConfig,
        refresh_token: &str,
    ) -> AuthResult<TokenSet> {
        let response = self.gateway.refresh_token(refresh_token, config).await?;
        let previous = self.store.get_tokens().await;

        let tokens = TokenSet {
            expires_at: response.expires_at(self.store.now()),
            token_type: response.token_type_or_default(),
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            id_token: response.id_token,
            user_display: previous.and_then(|p| p.user_display),
        };

        self.store.save_tokens(&tokens).await?;
        info!(expires_at = %tokens.expires_at, "Refreshed tokens");
        Ok(tokens)
    }

    /// Refresh the stored token set.
    pub async fn refresh_current(&self, config: &OAuthConfig) -> AuthResult<TokenSet> {
        let tokens = self
            .store
            .get_tokens()
            .await
            .ok_or(AuthError::NotAuthenticated)?;
        let refresh_token = tokens.refresh_token.ok_or(AuthError::NoRefreshToken)?;
        self.refresh_token(config, &refresh_token).await
    }

    /// True when an unexpired token set is stored.
    pub async fn is_authenticated(&self) -> bool {
        !self.store.is_expired().await
    }

    /// Forget the token set and everything left from the last attempt,
    /// including its provider config.
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.store.clear_all().await?;
        self.store.remove_config().await?;
        info!("Signed out");
        Ok(())
    }
}

/// Build the provider authorization URL.
pub fn authorization_url(config: &OAuthConfig, code_challenge: &str, state: &str) -> AuthResult<String> {
    let mut url = Url::parse(&config.authorization_endpoint).map_err(|e| {
        AuthError::invalid_config(format!("authorizationEndpoint is invalid: {e}"))
    })?;

    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.scope_string())
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD)
        .append_pair("state", state);

    Ok(url.into())
}
