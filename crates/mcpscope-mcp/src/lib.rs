//! Model Context Protocol client for mcpscope.
//!
//! [`McpSessionClient`] runs the session sequence (`initialize`,
//! `notifications/initialized`, `tools/list`, `tools/call`) against remote
//! endpoints. Messages go through an [`McpGateway`], which attaches the
//! bearer token and session header and decodes JSON or SSE replies.

pub mod client;
pub mod decode;
pub mod error;
pub mod gateway;
pub mod protocol;

pub use client::{InvokeResult, McpFailure, McpResponse, McpSessionClient, DEFAULT_SETTLE_DELAY};
pub use decode::{decode_body, decode_sse, is_event_stream};
pub use error::{McpError, McpResult};
pub use gateway::{
    ForwardRequest, GatewayReply, HttpMcpGateway, McpGateway, UpstreamForwarder, MCP_ACCEPT,
    MCP_ROUTE, SESSION_FIELD, SESSION_HEADER,
};
pub use protocol::{
    extract_tools, CallToolParams, ClientInfo, InitializeParams, JsonRpcError, JsonRpcRequest,
    McpTool, ServerInfo, ToolCallResult, ToolContent, ToolInputSchema, ToolProperty,
    PROTOCOL_VERSION,
};
