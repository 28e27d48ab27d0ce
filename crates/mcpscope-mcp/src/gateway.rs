//! MCP forwarding.
//!
//! The session client never talks to an MCP endpoint itself. It hands each
//! JSON-RPC message to an [`McpGateway`], which attaches the bearer token and
//! session header, forwards the message, and returns the decoded body.
//!
//! [`HttpMcpGateway`] reaches a gateway service over HTTP.
//! [`UpstreamForwarder`] does the forwarding in-process and is also what the
//! gateway service runs.

use crate::decode::decode_body;
use crate::error::{McpError, McpResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Path of the gateway's MCP route.
pub const MCP_ROUTE: &str = "/api/mcp";

/// Header carrying the MCP session identifier.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Field the gateway adds to decoded bodies when the endpoint assigned a session.
pub const SESSION_FIELD: &str = "_sessionId";

/// MCP endpoints must accept both media types.
pub const MCP_ACCEPT: &str = "application/json, text/event-stream";

/// A message to forward to an MCP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub mcp_request: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// What came back from the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl GatewayReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Session identifier injected into the body, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.body
            .get(SESSION_FIELD)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Best error text for a failed reply: `details`, then `error`.
    pub fn error_message(&self) -> String {
        ["details", "error"]
            .iter()
            .filter_map(|key| self.body.get(*key).and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .map(str::to_string)
            .or_else(|| self.body.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("Request failed with status {}", self.status))
    }
}

/// Forwards MCP messages.
#[async_trait]
pub trait McpGateway: Send + Sync {
    async fn forward(&self, request: ForwardRequest) -> McpResult<GatewayReply>;
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn status_text(status: reqwest::StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

/// [`McpGateway`] reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMcpGateway {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpMcpGateway {
    /// `base_url` is the gateway origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> McpResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> McpResult<Self> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(MCP_ROUTE))
            .map_err(|e| McpError::InvalidRequest(format!("gateway URL is invalid: {e}")))?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl McpGateway for HttpMcpGateway {
    async fn forward(&self, request: ForwardRequest) -> McpResult<GatewayReply> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let is_json = headers
            .get(CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.contains("application/json"));
        let text = response.text().await?;

        let body = if is_json {
            serde_json::from_str(&text)
                .map_err(|e| McpError::decode(format!("Invalid gateway response: {e}")))?
        } else {
            Value::String(text)
        };

        Ok(GatewayReply {
            status: status.as_u16(),
            status_text: status_text(status),
            headers,
            body,
        })
    }
}

/// Forwards straight to the MCP endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamForwarder {
    http: reqwest::Client,
}

impl Default for UpstreamForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamForwarder {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Client with a request timeout.
    pub fn with_timeout(timeout: Duration) -> McpResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::connection_failed(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(http))
    }
}

#[async_trait]
impl McpGateway for UpstreamForwarder {
    /// Non-success upstream statuses come back as a reply carrying
    /// `{error, status, details}`. Transport and decode failures are errors.
    async fn forward(&self, request: ForwardRequest) -> McpResult<GatewayReply> {
        let endpoint = Url::parse(&request.endpoint)
            .map_err(|e| McpError::InvalidRequest(format!("invalid MCP endpoint: {e}")))?;
        let method = request
            .mcp_request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        debug!(
            endpoint = %endpoint,
            method,
            has_token = request.access_token.is_some(),
            has_session = request.session_id.is_some(),
            "Forwarding MCP request"
        );

        let mut builder = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, MCP_ACCEPT)
            .body(serde_json::to_string(&request.mcp_request)?);
        if let Some(token) = request.access_token.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(session) = request.session_id.as_deref().filter(|s| !s.is_empty()) {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = collect_headers(response.headers());
        let text = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), method, "MCP request failed");
            return Ok(GatewayReply {
                status: status.as_u16(),
                status_text: status_text(status),
                headers,
                body: json!({
                    "error": "MCP request failed",
                    "status": status.as_u16(),
                    "details": text,
                }),
            });
        }

        let mut body = decode_body(headers.get(CONTENT_TYPE.as_str()).map(String::as_str), &text)?;

        if let Some(session) = headers.get(SESSION_HEADER) {
            debug!(session_id = %session, "MCP session id received");
            if let Value::Object(map) = &mut body {
                map.insert(SESSION_FIELD.to_string(), Value::String(session.clone()));
            }
        }

        Ok(GatewayReply {
            status: status.as_u16(),
            status_text: status_text(status),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forward_request(endpoint: String) -> ForwardRequest {
        ForwardRequest {
            endpoint,
            access_token: Some("at-1".to_string()),
            mcp_request: json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {}}),
            session_id: Some("sess-1".to_string()),
        }
    }

    #[test]
    fn test_forward_request_wire_shape() {
        let value = serde_json::to_value(forward_request("https://mcp.example.com".into())).unwrap();
        assert_eq!(value["endpoint"], "https://mcp.example.com");
        assert_eq!(value["accessToken"], "at-1");
        assert_eq!(value["sessionId"], "sess-1");
        assert_eq!(value["mcpRequest"]["method"], "tools/list");

        let bare = ForwardRequest {
            access_token: None,
            session_id: None,
            ..forward_request("x".into())
        };
        let value = serde_json::to_value(bare).unwrap();
        assert!(value.get("accessToken").is_none());
        assert!(value.get("sessionId").is_none());
    }

    #[test]
    fn test_reply_helpers() {
        let reply = GatewayReply {
            status: 502,
            status_text: "Bad Gateway".to_string(),
            headers: BTreeMap::new(),
            body: json!({"error": "MCP request failed", "status": 502, "details": "upstream down"}),
        };
        assert!(!reply.is_success());
        assert_eq!(reply.error_message(), "upstream down");
        assert!(reply.session_id().is_none());

        let reply = GatewayReply {
            status: 500,
            body: Value::String(String::new()),
            ..reply
        };
        assert_eq!(reply.error_message(), "Request failed with status 500");
    }

    #[tokio::test]
    async fn test_upstream_attaches_headers_and_injects_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(header("authorization", "Bearer at-1"))
            .and(header("mcp-session-id", "sess-1"))
            .and(body_json(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("mcp-session-id", "sess-2")
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"tools\":[]}}\n\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let forwarder = UpstreamForwarder::new();
        let reply = forwarder
            .forward(forward_request(format!("{}/mcp", server.uri())))
            .await
            .unwrap();

        assert!(reply.is_success());
        assert_eq!(reply.body["result"]["tools"], json!([]));
        assert_eq!(reply.session_id(), Some("sess-2"));
    }

    #[tokio::test]
    async fn test_upstream_without_token_sends_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(header_exists("mcp-session-id"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let request = ForwardRequest {
            endpoint: server.uri(),
            access_token: None,
            mcp_request: json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            session_id: None,
        };
        let reply = UpstreamForwarder::new().forward(request).await.unwrap();
        assert_eq!(reply.body, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_upstream_empty_body_acknowledged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let reply = UpstreamForwarder::new()
            .forward(forward_request(server.uri()))
            .await
            .unwrap();
        assert_eq!(reply.status, 202);
        assert_eq!(reply.body, json!({"success": true}));
    }

    #[tokio::test]
    async fn test_upstream_error_status_becomes_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let reply = UpstreamForwarder::new()
            .forward(forward_request(server.uri()))
            .await
            .unwrap();
        assert_eq!(reply.status, 401);
        assert_eq!(
            reply.body,
            json!({"error": "MCP request failed", "status": 401, "details": "invalid token"})
        );
        assert_eq!(reply.error_message(), "invalid token");
    }

    #[tokio::test]
    async fn test_upstream_decode_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("event: ping\n\n"),
            )
            .mount(&server)
            .await;

        let err = UpstreamForwarder::new()
            .forward(forward_request(server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Decode(_)));
    }

    #[tokio::test]
    async fn test_upstream_rejects_invalid_endpoint() {
        let err = UpstreamForwarder::new()
            .forward(forward_request("not a url".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_http_gateway_posts_forward_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MCP_ROUTE))
            .and(body_json(json!({
                "endpoint": "https://mcp.example.com/mcp",
                "accessToken": "at-1",
                "mcpRequest": {"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {}},
                "sessionId": "sess-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"tools": []},
                "_sessionId": "sess-1"
            })))
            .mount(&server)
            .await;

        let gateway = HttpMcpGateway::new(&server.uri()).unwrap();
        let reply = gateway
            .forward(forward_request("https://mcp.example.com/mcp".to_string()))
            .await
            .unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.status_text, "OK");
        assert_eq!(reply.session_id(), Some("sess-1"));
        assert!(reply.headers.contains_key("content-type"));
    }

    #[tokio::test]
    async fn test_http_gateway_non_json_body_kept_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let gateway = HttpMcpGateway::new(&server.uri()).unwrap();
        let reply = gateway
            .forward(forward_request("https://mcp.example.com".to_string()))
            .await
            .unwrap();
        assert_eq!(reply.status, 503);
        assert_eq!(reply.body, Value::String("maintenance".to_string()));
        assert_eq!(reply.error_message(), "maintenance");
    }
}
