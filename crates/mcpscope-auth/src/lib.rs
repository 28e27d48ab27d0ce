//! OAuth 2.0 authorization code + PKCE client for mcpscope.
//!
//! The pieces, leaf first:
//!
//! - [`CredentialStore`]: the durable token set plus the session-scoped
//!   state of one authorization attempt (verifier, CSRF state, replay guard).
//! - [`OAuthFlow`]: builds the authorization request, validates the callback,
//!   exchanges the code and refreshes tokens through a [`TokenGateway`].
//! - [`TokenMonitor`]: background task that refreshes tokens shortly before
//!   they expire.
//!
//! # Example
//!
//! ```no_run
//! use mcpscope_auth::{CallbackParams, CredentialStore, HttpTokenGateway, OAuthConfig, OAuthFlow};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), mcpscope_auth::AuthError> {
//! let store = Arc::new(CredentialStore::in_memory());
//! let gateway = Arc::new(HttpTokenGateway::new("http://localhost:3000")?);
//! let flow = OAuthFlow::new(store, gateway);
//!
//! let config = OAuthConfig::new(
//!     "https://idp.example.com/oauth2/v1/authorize",
//!     "https://idp.example.com/oauth2/v1/token",
//!     "my-client-id",
//! );
//! let request = flow.begin_authorization(&config).await?;
//! println!("Open {}", request.url);
//!
//! // ...later, with the query string the provider redirected to
//! let outcome = flow
//!     .handle_callback(CallbackParams::from_query("code=abc&state=xyz"))
//!     .await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod clock;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod monitor;
pub mod pkce;
pub mod store;
pub mod token_endpoint;
pub mod types;

pub use claims::{decode_identity_claims, resolve_display_identity, Claims};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, AuthResult};
pub use flow::{AuthorizationRequest, CallbackOutcome, CallbackParams, OAuthFlow};
pub use gateway::{
    ErrorEnvelope, ExchangeRequest, HttpTokenGateway, RefreshRequest, TokenGateway, TOKEN_ROUTE,
};
pub use monitor::{MonitorSettings, TokenMonitor};
pub use pkce::PkceChallenge;
pub use store::CredentialStore;
pub use token_endpoint::{TokenEndpointClient, TokenGrant};
pub use types::{OAuthConfig, ProviderKind, TokenResponse, TokenSet};
