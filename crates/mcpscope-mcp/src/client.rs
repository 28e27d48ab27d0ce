//! MCP session client.

use crate::gateway::{ForwardRequest, McpGateway};
use crate::protocol::{
    extract_tools, CallToolParams, ClientInfo, InitializeParams, JsonRpcError, JsonRpcRequest,
    McpTool, ServerInfo,
};
use mcpscope_auth::CredentialStore;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Pause after `notifications/initialized` so the server can finish setup.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// A successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct McpResponse {
    pub status: u16,
    pub status_text: String,
    pub data: Value,
    pub headers: BTreeMap<String, String>,
    pub elapsed_ms: u64,
}

/// A failed call: transport error, non-success status or undecodable body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct McpFailure {
    pub message: String,
    /// Status of the reply, when there was one.
    pub status: Option<u16>,
    pub elapsed_ms: u64,
}

impl McpFailure {
    fn new(message: impl Into<String>, status: Option<u16>, elapsed_ms: u64) -> Self {
        Self {
            message: message.into(),
            status,
            elapsed_ms,
        }
    }
}

pub type InvokeResult = Result<McpResponse, McpFailure>;

/// Talks MCP to any number of endpoints through an [`McpGateway`].
///
/// Each endpoint gets its own session id, recorded from the first reply that
/// carries one and sent on every later call to that endpoint. Calls to one
/// endpoint are expected to be serialized.
pub struct McpSessionClient {
    gateway: Arc<dyn McpGateway>,
    store: Arc<CredentialStore>,
    sessions: RwLock<HashMap<String, String>>,
    next_id: AtomicU64,
    settle_delay: Duration,
    client_info: ClientInfo,
}

impl McpSessionClient {
    pub fn new(gateway: Arc<dyn McpGateway>, store: Arc<CredentialStore>) -> Self {
        Self {
            gateway,
            store,
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            settle_delay: DEFAULT_SETTLE_DELAY,
            client_info: ClientInfo::default(),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_client_info(mut self, client_info: ClientInfo) -> Self {
        self.client_info = client_info;
        self
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Session id recorded for `endpoint`.
    pub async fn session_id(&self, endpoint: &str) -> Option<String> {
        self.sessions.read().await.get(endpoint).cloned()
    }

    /// Drop the session for `endpoint`. The next call goes out without one.
    pub async fn forget_session(&self, endpoint: &str) -> Option<String> {
        self.sessions.write().await.remove(endpoint)
    }

    /// Send one JSON-RPC message.
    ///
    /// Attaches the access token if one is stored and unexpired, and the
    /// session id recorded for this endpoint. Never returns early with a
    /// partial result: every outcome is timed and wrapped.
    pub async fn invoke(&self, endpoint: &str, request: JsonRpcRequest) -> InvokeResult {
        let started = Instant::now();
        let elapsed = || started.elapsed().as_millis() as u64;

        let mcp_request = serde_json::to_value(&request)
            .map_err(|e| McpFailure::new(format!("Failed to encode request: {e}"), None, elapsed()))?;

        let forward = ForwardRequest {
            endpoint: endpoint.to_string(),
            access_token: self.store.valid_access_token().await,
            mcp_request,
            session_id: self.session_id(endpoint).await,
        };

        debug!(
            endpoint,
            method = %request.method,
            id = ?request.id,
            has_session = forward.session_id.is_some(),
            "Invoking MCP method"
        );

        let reply = match self.gateway.forward(forward).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(endpoint, method = %request.method, error = %e, "MCP request failed");
                return Err(McpFailure::new(e.to_string(), None, elapsed()));
            }
        };

        if !reply.is_success() {
            let message = reply.error_message();
            warn!(endpoint, method = %request.method, status = reply.status, %message, "MCP request rejected");
            return Err(McpFailure::new(message, Some(reply.status), elapsed()));
        }

        if let Some(session) = reply.session_id() {
            let mut sessions = self.sessions.write().await;
            if sessions.get(endpoint).map(String::as_str) != Some(session) {
                debug!(endpoint, session_id = %session, "Recorded MCP session");
                sessions.insert(endpoint.to_string(), session.to_string());
            }
        }

        Ok(McpResponse {
            status: reply.status,
            status_text: reply.status_text,
            data: reply.body,
            headers: reply.headers,
            elapsed_ms: elapsed(),
        })
    }

    /// `initialize`, then `notifications/initialized`, then the settle delay.
    ///
    /// A failed or JSON-RPC-error initialize is returned as a failure and the
    /// notification is not sent. A failed notification is only logged.
    pub async fn initialize_session(&self, endpoint: &str) -> InvokeResult {
        let params = InitializeParams::new(self.client_info.clone());
        let params = serde_json::to_value(&params)
            .map_err(|e| McpFailure::new(format!("Failed to encode request: {e}"), None, 0))?;
        let request = JsonRpcRequest::new(self.next_request_id(), "initialize", Some(params));

        let response = self.invoke(endpoint, request).await?;

        if let Some(error) = JsonRpcError::from_response(&response.data) {
            warn!(endpoint, code = error.code, message = %error.message, "MCP initialize rejected");
            return Err(McpFailure::new(
                format!("Initialization failed: {}", error.message),
                Some(response.status),
                response.elapsed_ms,
            ));
        }

        match ServerInfo::from_response(&response.data) {
            Some(server) => info!(
                endpoint,
                server = %server.name,
                version = server.version.as_deref().unwrap_or("unknown"),
                "MCP session initialized"
            ),
            None => info!(endpoint, "MCP session initialized"),
        }

        let notification = JsonRpcRequest::notification("notifications/initialized", Some(json!({})));
        if let Err(failure) = self.invoke(endpoint, notification).await {
            warn!(endpoint, error = %failure, "Initialized notification failed");
        }

        tokio::time::sleep(self.settle_delay).await;
        Ok(response)
    }

    /// `tools/list`. See [`extract_tools`] for reading the result.
    pub async fn list_tools(&self, endpoint: &str) -> InvokeResult {
        let request = JsonRpcRequest::new(self.next_request_id(), "tools/list", Some(json!({})));
        self.invoke(endpoint, request).await
    }

    /// `tools/list`, parsed.
    pub async fn discover_tools(&self, endpoint: &str) -> Result<Vec<McpTool>, McpFailure> {
        let response = self.list_tools(endpoint).await?;
        let tools = extract_tools(&response.data);
        debug!(endpoint, count = tools.len(), "Discovered MCP tools");
        Ok(tools)
    }

    /// `tools/call` with `{name, arguments}`.
    pub async fn call_tool(&self, endpoint: &str, name: &str, arguments: Value) -> InvokeResult {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let params = serde_json::to_value(&params)
            .map_err(|e| McpFailure::new(format!("Failed to encode request: {e}"), None, 0))?;
        let request = JsonRpcRequest::new(self.next_request_id(), "tools/call", Some(params));
        self.invoke(endpoint, request).await
    }
}

impl std::fmt::Debug for McpSessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSessionClient")
            .field("settle_delay", &self.settle_delay)
            .field("client_info", &self.client_info)
            .finish_non_exhaustive()
    }
}
