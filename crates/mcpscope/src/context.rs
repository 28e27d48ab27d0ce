//! Wiring shared by every command.

use crate::config::Config;
use anyhow::{anyhow, Context};
use mcpscope_auth::{
    CredentialStore, HttpTokenGateway, OAuthConfig, OAuthFlow, TokenEndpointClient, TokenGateway,
};
use mcpscope_mcp::{HttpMcpGateway, McpGateway, McpSessionClient, UpstreamForwarder};
use mcpscope_storage::{FileStorage, MemoryStorage, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub struct App {
    pub config: Config,
    pub store: Arc<CredentialStore>,
    pub flow: Arc<OAuthFlow>,
}

impl App {
    pub async fn load(cwd: &Path) -> anyhow::Result<Self> {
        let (config, sources) = Config::load(Some(cwd))
            .await
            .context("Failed to load configuration")?;
        debug!(sources = ?sources, "Configuration loaded");

        let dir = credentials_dir()?;
        Self::with_config(config, &dir)
    }

    pub fn with_config(config: Config, credentials_dir: &Path) -> anyhow::Result<Self> {
        let durable: Arc<dyn Storage> = Arc::new(FileStorage::new(credentials_dir));
        let session: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = Arc::new(CredentialStore::new(durable, session));

        let gateway: Arc<dyn TokenGateway> = match config.gateway.url.as_deref() {
            Some(url) => Arc::new(
                HttpTokenGateway::new(url).with_context(|| format!("Invalid gateway URL: {url}"))?,
            ),
            None => Arc::new(TokenEndpointClient::new(config.gateway.client_secret.clone())),
        };
        let flow = Arc::new(OAuthFlow::new(store.clone(), gateway));

        Ok(Self {
            config,
            store,
            flow,
        })
    }

    /// The provider settings, or an error explaining where to put them.
    pub fn oauth(&self) -> anyhow::Result<&OAuthConfig> {
        self.config.oauth.as_ref().ok_or_else(|| {
            anyhow!("No OAuth provider configured. Add an \"oauth\" block to mcpscope.jsonc")
        })
    }

    /// `explicit`, else the configured default endpoint.
    pub fn endpoint(&self, explicit: Option<String>) -> anyhow::Result<String> {
        explicit
            .or_else(|| self.config.endpoint.clone())
            .ok_or_else(|| anyhow!("No MCP endpoint given and none configured"))
    }

    pub fn mcp_client(&self) -> anyhow::Result<McpSessionClient> {
        let gateway: Arc<dyn McpGateway> = match self.config.gateway.url.as_deref() {
            Some(url) => Arc::new(
                HttpMcpGateway::new(url).with_context(|| format!("Invalid gateway URL: {url}"))?,
            ),
            None => Arc::new(UpstreamForwarder::new()),
        };
        Ok(McpSessionClient::new(gateway, self.store.clone()))
    }
}

fn credentials_dir() -> anyhow::Result<PathBuf> {
    Config::data_dir()
        .map(|dir| dir.join("credentials"))
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            endpoint: Some("https://configured.example.com/mcp".to_string()),
            ..Default::default()
        };
        let app = App::with_config(config, dir.path()).unwrap();

        assert_eq!(
            app.endpoint(Some("https://given.example.com".to_string())).unwrap(),
            "https://given.example.com"
        );
        assert_eq!(app.endpoint(None).unwrap(), "https://configured.example.com/mcp");
        assert!(app.oauth().is_err());
    }

    #[test]
    fn test_invalid_gateway_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.gateway.url = Some("not a url".to_string());
        assert!(App::with_config(config, dir.path()).is_err());
    }

    #[tokio::test]
    async fn test_tokens_persist_across_apps() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = mcpscope_auth::TokenSet {
            access_token: "at".to_string(),
            refresh_token: None,
            id_token: None,
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            token_type: "Bearer".to_string(),
            user_display: Some("ada@example.com".to_string()),
        };

        let first = App::with_config(Config::default(), dir.path()).unwrap();
        first.store.save_tokens(&tokens).await.unwrap();

        let second = App::with_config(Config::default(), dir.path()).unwrap();
        assert_eq!(second.store.get_tokens().await, Some(tokens));
        assert!(second.flow.is_authenticated().await);
    }
}
