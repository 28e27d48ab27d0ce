//! Credential store.
//!
//! The token set lives in durable storage and survives restarts. Everything
//! belonging to a single authorization attempt (PKCE verifier, CSRF state,
//! the config used, and the replay guard) lives in session storage.

use crate::claims::{decode_identity_claims, Claims};
use crate::clock::{Clock, SystemClock};
use crate::error::AuthResult;
use crate::types::{OAuthConfig, TokenSet};
use chrono::{DateTime, Utc};
use mcpscope_storage::{MemoryStorage, Storage, StorageExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Storage keys.
pub mod keys {
    /// Durable token set.
    pub const TOKENS: &str = "mcp_oauth_tokens";
    pub const PKCE_VERIFIER: &str = "pkce_code_verifier";
    pub const CSRF_STATE: &str = "oauth_state";
    pub const CONFIG: &str = "oauth_config";
    /// Replay guard: the last authorization code handed to the exchange.
    pub const PROCESSED_CODE: &str = "processed_auth_code";
}

/// Local persistence for tokens and in-flight authorization state.
#[derive(Clone)]
pub struct CredentialStore {
    durable: Arc<dyn Storage>,
    session: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn Storage>, session: Arc<dyn Storage>) -> Self {
        Self {
            durable,
            session,
            clock: Arc::new(SystemClock),
        }
    }

    /// A store backed entirely by memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    /// Replace the clock used for expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // Tokens

    /// Replace the stored token set.
    pub async fn save_tokens(&self, tokens: &TokenSet) -> AuthResult<()> {
        self.durable.write_json(keys::TOKENS, tokens).await?;
        debug!(expires_at = %tokens.expires_at, "Saved tokens");
        Ok(())
    }

    /// The stored token set. Unreadable data is treated as absent.
    pub async fn get_tokens(&self) -> Option<TokenSet> {
        read_slot(self.durable.as_ref(), keys::TOKENS).await
    }

    /// True when no token set is stored or it has expired.
    pub async fn is_expired(&self) -> bool {
        match self.get_tokens().await {
            Some(tokens) => tokens.is_expired_at(self.now()),
            None => true,
        }
    }

    /// Time left on the stored token, zero when absent or expired.
    pub async fn time_until_expiry(&self) -> Duration {
        self.get_tokens()
            .await
            .map(|tokens| tokens.time_until_expiry_at(self.now()))
            .unwrap_or(Duration::ZERO)
    }

    /// The access token, only if present and unexpired.
    pub async fn valid_access_token(&self) -> Option<String> {
        self.get_tokens()
            .await
            .filter(|tokens| !tokens.is_expired_at(self.now()))
            .map(|tokens| tokens.access_token)
    }

    /// Forget tokens, verifier and CSRF state.
    pub async fn clear_all(&self) -> AuthResult<()> {
        self.durable.remove(keys::TOKENS).await?;
        self.session.remove(keys::PKCE_VERIFIER).await?;
        self.session.remove(keys::CSRF_STATE).await?;
        debug!("Cleared credentials");
        Ok(())
    }

    // PKCE verifier

    pub async fn save_pkce_verifier(&self, verifier: &str) -> AuthResult<()> {
        Ok(self.session.write_json(keys::PKCE_VERIFIER, &verifier).await?)
    }

    pub async fn get_pkce_verifier(&self) -> Option<String> {
        read_slot(self.session.as_ref(), keys::PKCE_VERIFIER).await
    }

    pub async fn remove_pkce_verifier(&self) -> AuthResult<()> {
        Ok(self.session.remove(keys::PKCE_VERIFIER).await?)
    }

    // CSRF state

    pub async fn save_csrf_state(&self, state: &str) -> AuthResult<()> {
        Ok(self.session.write_json(keys::CSRF_STATE, &state).await?)
    }

    pub async fn get_csrf_state(&self) -> Option<String> {
        read_slot(self.session.as_ref(), keys::CSRF_STATE).await
    }

    pub async fn remove_csrf_state(&self) -> AuthResult<()> {
        Ok(self.session.remove(keys::CSRF_STATE).await?)
    }

    // Config of the in-flight attempt

    pub async fn save_config(&self, config: &OAuthConfig) -> AuthResult<()> {
        Ok(self.session.write_json(keys::CONFIG, config).await?)
    }

    pub async fn get_config(&self) -> Option<OAuthConfig> {
        read_slot(self.session.as_ref(), keys::CONFIG).await
    }

    pub async fn remove_config(&self) -> AuthResult<()> {
        Ok(self.session.remove(keys::CONFIG).await?)
    }

    // Replay guard

    pub async fn processed_code(&self) -> Option<String> {
        read_slot(self.session.as_ref(), keys::PROCESSED_CODE).await
    }

    pub async fn remember_code(&self, code: &str) -> AuthResult<()> {
        Ok(self.session.write_json(keys::PROCESSED_CODE, &code).await?)
    }

    pub async fn forget_code(&self) -> AuthResult<()> {
        Ok(self.session.remove(keys::PROCESSED_CODE).await?)
    }

    /// Decode the claims of a JWT-shaped token without verifying it.
    pub fn decode_identity_claims(&self, token: &str) -> Option<Claims> {
        decode_identity_claims(token)
    }
}

async fn read_slot<T: DeserializeOwned + Send>(
    storage: &dyn Storage,
    key: &str,
) -> Option<T> {
    match storage.read_json(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Ignoring unreadable credential entry");
            None
        }
    }
}
