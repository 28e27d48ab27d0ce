//! Response body decoding.
//!
//! MCP servers answer with plain JSON, with a Server-Sent Events stream that
//! carries the JSON in `data:` lines, or with nothing at all (notifications).

use crate::error::{McpError, McpResult};
use serde_json::{json, Value};

const EVENT_STREAM: &str = "text/event-stream";
const DATA_PREFIX: &str = "data:";
const DATA_LINE_PREFIX: &str = "data: ";

/// Decode a response body.
///
/// - empty or whitespace-only: `{"success": true}`
/// - event-stream content type, or a body starting with `data:`: the JSON
///   of the last event's data line
/// - anything else: plain JSON
pub fn decode_body(content_type: Option<&str>, body: &str) -> McpResult<Value> {
    if body.trim().is_empty() {
        return Ok(json!({ "success": true }));
    }

    if is_event_stream(content_type, body) {
        return decode_sse(body);
    }

    serde_json::from_str(body).map_err(|e| McpError::decode(format!("Invalid JSON response: {e}")))
}

/// Whether a body should be treated as Server-Sent Events.
pub fn is_event_stream(content_type: Option<&str>, body: &str) -> bool {
    content_type.is_some_and(|ct| ct.contains(EVENT_STREAM)) || body.starts_with(DATA_PREFIX)
}

/// Decode the most recent event of an SSE body.
pub fn decode_sse(body: &str) -> McpResult<Value> {
    let normalized = body.replace("\r\n", "\n");
    let last_event = normalized
        .split("\n\n")
        .filter(|event| !event.trim().is_empty())
        .last()
        .ok_or_else(|| McpError::decode("Invalid SSE format: no events found"))?;

    let data = last_event
        .lines()
        .find_map(|line| line.strip_prefix(DATA_LINE_PREFIX))
        .ok_or_else(|| McpError::decode("Invalid SSE format: no data line found"))?;

    serde_json::from_str(data).map_err(|e| McpError::decode(format!("Invalid SSE data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_acknowledgement() {
        assert_eq!(decode_body(None, "").unwrap(), json!({"success": true}));
        assert_eq!(
            decode_body(Some("application/json"), "  \n ").unwrap(),
            json!({"success": true})
        );
    }

    #[test]
    fn test_plain_json() {
        let value = decode_body(Some("application/json"), r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
            .unwrap();
        assert_eq!(value["id"], 1);

        // No content type, starts with `{`
        let value = decode_body(None, r#"{"ok":true}"#).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_sse_takes_last_event() {
        let body = "event: message\ndata: {\"id\":1,\"result\":\"first\"}\n\n\
                    event: message\ndata: {\"id\":2,\"result\":\"second\"}\n\n";
        let value = decode_body(Some("text/event-stream"), body).unwrap();
        assert_eq!(value, json!({"id": 2, "result": "second"}));
    }

    #[test]
    fn test_sse_detected_from_body_prefix() {
        let body = "data: {\"result\":{\"tools\":[]}}\n\n";
        let value = decode_body(Some("text/plain"), body).unwrap();
        assert_eq!(value["result"]["tools"], json!([]));

        let value = decode_body(None, body).unwrap();
        assert_eq!(value["result"]["tools"], json!([]));
    }

    #[test]
    fn test_sse_with_crlf() {
        let body = "event: message\r\ndata: {\"a\":1}\r\n\r\n";
        assert_eq!(
            decode_body(Some("text/event-stream; charset=utf-8"), body).unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn test_sse_without_data_line_fails() {
        let err = decode_body(Some("text/event-stream"), "event: ping\nid: 4\n\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Decode error: Invalid SSE format: no data line found"
        );
    }

    #[test]
    fn test_sse_last_event_without_data_fails() {
        let body = "data: {\"a\":1}\n\nevent: keepalive\n\n";
        assert!(decode_body(Some("text/event-stream"), body).is_err());
    }

    #[test]
    fn test_malformed_payloads_are_decode_errors() {
        assert!(matches!(
            decode_body(None, "not json"),
            Err(McpError::Decode(_))
        ));
        assert!(matches!(
            decode_body(Some("text/event-stream"), "data: {broken\n\n"),
            Err(McpError::Decode(_))
        ));
    }
}
