//! MCP protocol types.
//!
//! JSON-RPC 2.0 envelopes plus the subset of MCP payloads this client uses:
//! initialization, tool listing and tool calls.
//! See: <https://spec.modelcontextprotocol.io/>

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC request (or notification if id is None).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Request ID. None for notifications (which don't expect a response).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Create a notification. No id, no response expected.
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Check if this is a notification (no response expected).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// The `error` member of a decoded response, if it has one.
    pub fn from_response(data: &Value) -> Option<Self> {
        data.get("error")
            .and_then(|e| serde_json::from_value(e.clone()).ok())
    }
}

/// MCP initialization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self::new(ClientInfo::default())
    }
}

impl InitializeParams {
    /// Declares the tools capability only.
    pub fn new(client_info: ClientInfo) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({ "tools": {} }),
            client_info,
        }
    }
}

/// Client info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "mcpscope".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server info from the initialize result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ServerInfo {
    /// `result.serverInfo` of an initialize response.
    pub fn from_response(data: &Value) -> Option<Self> {
        data.pointer("/result/serverInfo")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// MCP tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: ToolInputSchema,
}

/// JSON Schema of a tool's arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, ToolProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

fn object_type() -> String {
    "object".to_string()
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        Self {
            schema_type: object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

impl ToolInputSchema {
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }
}

/// One property of a tool's input schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolProperty {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ToolProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, ToolProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
}

/// Tool call parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Value,
}

/// Tool call result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    #[serde(default)]
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// `result` of a `tools/call` response.
    pub fn from_response(data: &Value) -> Option<Self> {
        data.get("result")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Text items joined by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ToolContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Tool content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    #[serde(rename = "resource")]
    Resource { resource: Value },
    #[serde(other)]
    Unknown,
}

/// Find the tool list in a `tools/list` response.
///
/// Looks under `result.tools` first and falls back to a bare `tools` member
/// for servers that skip the JSON-RPC envelope. Entries that do not parse as
/// tools are skipped.
pub fn extract_tools(data: &Value) -> Vec<McpTool> {
    let list = data
        .pointer("/result/tools")
        .or_else(|| data.get("tools"))
        .and_then(Value::as_array);

    match list {
        Some(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(1, "tools/list", Some(json!({})));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {}})
        );
        assert!(!request.is_notification());
    }

    #[test]
    fn test_notification_has_no_id() {
        let notification = JsonRpcRequest::notification("notifications/initialized", None);
        let value = serde_json::to_value(&notification).unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("params").is_none());
        assert!(notification.is_notification());
    }

    #[test]
    fn test_initialize_params() {
        let params = InitializeParams::default();
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(value["capabilities"], json!({"tools": {}}));
        assert_eq!(value["clientInfo"]["name"], "mcpscope");
    }

    #[test]
    fn test_tool_schema_parsing() {
        let tool: McpTool = serde_json::from_value(json!({
            "name": "search",
            "description": "Search documents",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search text"},
                    "tags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "uniqueItems": true
                    },
                    "filter": {
                        "type": "object",
                        "properties": {"owner": {"type": "string"}}
                    }
                },
                "required": ["query"]
            }
        }))
        .unwrap();

        assert_eq!(tool.name, "search");
        let schema = &tool.input_schema;
        assert!(schema.is_required("query"));
        assert!(!schema.is_required("tags"));

        let tags = &schema.properties["tags"];
        assert_eq!(tags.property_type.as_deref(), Some("array"));
        assert_eq!(
            tags.items.as_ref().unwrap().property_type.as_deref(),
            Some("string")
        );
        assert_eq!(tags.min_items, Some(1));
        assert_eq!(tags.unique_items, Some(true));
        assert!(schema.properties["filter"]
            .properties
            .as_ref()
            .unwrap()
            .contains_key("owner"));
    }

    #[test]
    fn test_tool_without_schema() {
        let tool: McpTool = serde_json::from_value(json!({"name": "ping"})).unwrap();
        assert_eq!(tool.description, "");
        assert_eq!(tool.input_schema, ToolInputSchema::default());
    }

    #[test]
    fn test_extract_tools_paths() {
        let enveloped = json!({"jsonrpc": "2.0", "id": 2, "result": {"tools": [{"name": "a"}]}});
        assert_eq!(extract_tools(&enveloped)[0].name, "a");

        let bare = json!({"tools": [{"name": "b"}, {"name": "c"}]});
        let names: Vec<_> = extract_tools(&bare).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["b", "c"]);

        let with_junk = json!({"tools": [{"name": "d"}, 42, {"description": "nameless"}]});
        assert_eq!(extract_tools(&with_junk).len(), 1);

        assert!(extract_tools(&json!({"result": {}})).is_empty());
    }

    #[test]
    fn test_tool_call_result() {
        let data = json!({
            "result": {
                "content": [
                    {"type": "text", "text": "line 1"},
                    {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                    {"type": "audio"},
                    {"type": "text", "text": "line 2"}
                ],
                "isError": false
            }
        });
        let result = ToolCallResult::from_response(&data).unwrap();
        assert_eq!(result.content.len(), 4);
        assert_eq!(result.content[2], ToolContent::Unknown);
        assert_eq!(result.text(), "line 1\nline 2");
        assert!(!result.is_error);
    }

    #[test]
    fn test_json_rpc_error_and_server_info() {
        let data = json!({"error": {"code": -32601, "message": "Method not found"}});
        let error = JsonRpcError::from_response(&data).unwrap();
        assert_eq!(error.code, -32601);

        let data = json!({"result": {"serverInfo": {"name": "demo", "version": "1.2"}}});
        let info = ServerInfo::from_response(&data).unwrap();
        assert_eq!(info.name, "demo");
        assert_eq!(info.version.as_deref(), Some("1.2"));
    }
}
