//! Shared gateway state.

use mcpscope_auth::{CallbackParams, TokenEndpointClient};
use mcpscope_mcp::UpstreamForwarder;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// One-shot slot a login waits on for the browser callback.
#[derive(Debug, Clone, Default)]
pub struct CallbackCapture {
    sender: Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>,
}

impl CallbackCapture {
    /// A capture slot and the receiver that resolves when it fires.
    pub fn channel() -> (Self, oneshot::Receiver<CallbackParams>) {
        let (tx, rx) = oneshot::channel();
        let capture = Self {
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        (capture, rx)
    }

    /// Hand `params` to the waiting login. False if it already fired or the
    /// receiver is gone.
    pub async fn deliver(&self, params: CallbackParams) -> bool {
        match self.sender.lock().await.take() {
            Some(tx) => tx.send(params).is_ok(),
            None => false,
        }
    }
}

/// State behind every gateway route.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub token_client: Arc<TokenEndpointClient>,
    pub forwarder: Arc<UpstreamForwarder>,
    /// Present while a CLI login is waiting on `GET /`.
    pub capture: Option<CallbackCapture>,
}

impl GatewayState {
    pub fn new(client_secret: Option<String>) -> Self {
        Self {
            token_client: Arc::new(TokenEndpointClient::new(client_secret)),
            forwarder: Arc::new(UpstreamForwarder::new()),
            capture: None,
        }
    }

    pub fn with_capture(mut self, capture: CallbackCapture) -> Self {
        self.capture = Some(capture);
        self
    }
}
