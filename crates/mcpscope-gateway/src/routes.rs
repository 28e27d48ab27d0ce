//! Gateway route handlers.

use crate::error::{GatewayError, GatewayResult};
use crate::page;
use crate::state::GatewayState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use mcpscope_auth::{CallbackParams, ExchangeRequest, RefreshRequest, TokenGrant};
use mcpscope_mcp::{ForwardRequest, McpGateway};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

const MISSING_PARAMETERS: &str = "Missing required parameters";
const MISSING_ENDPOINT: &str = "MCP endpoint is required";
const MISSING_MCP_REQUEST: &str = "MCP request body is required";
const MISSING_CODE_OR_STATE: &str = "Missing code or state parameter";

/// Unparseable bodies are internal errors, not rejections.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> GatewayResult<T> {
    Ok(serde_json::from_slice(body)?)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /api/auth/token`: exchange an authorization code.
pub async fn token_exchange(
    State(state): State<GatewayState>,
    body: Bytes,
) -> GatewayResult<Json<Value>> {
    let request: ExchangeRequest = parse_body(&body)?;
    info!("Token exchange request received");

    let (Some(code), Some(code_verifier), Some(config)) = (
        present(request.code),
        present(request.code_verifier),
        request.config,
    ) else {
        return Err(GatewayError::BadRequest(MISSING_PARAMETERS));
    };

    let tokens = state
        .token_client
        .request(
            &config,
            TokenGrant::AuthorizationCode {
                code: &code,
                code_verifier: &code_verifier,
            },
        )
        .await?;
    info!("Token exchange successful");
    Ok(Json(tokens))
}

/// `PUT /api/auth/token`: refresh an access token.
pub async fn token_refresh(
    State(state): State<GatewayState>,
    body: Bytes,
) -> GatewayResult<Json<Value>> {
    let request: RefreshRequest = parse_body(&body)?;
    info!("Token refresh request received");

    let (Some(refresh_token), Some(config)) = (present(request.refresh_token), request.config)
    else {
        return Err(GatewayError::BadRequest(MISSING_PARAMETERS));
    };

    let tokens = state
        .token_client
        .request(
            &config,
            TokenGrant::RefreshToken {
                refresh_token: &refresh_token,
            },
        )
        .await?;
    info!("Token refresh successful");
    Ok(Json(tokens))
}

/// Where the provider's redirect is sent next.
pub fn callback_location(params: &CallbackParams) -> String {
    if let Some(error) = present(params.error.clone()) {
        let message = present(params.error_description.clone()).unwrap_or(error);
        return format!("/?error={}", urlencoding::encode(&message));
    }

    match (present(params.code.clone()), present(params.state.clone())) {
        (Some(code), Some(state)) => format!(
            "/?code={}&state={}",
            urlencoding::encode(&code),
            urlencoding::encode(&state)
        ),
        _ => format!("/?error={}", urlencoding::encode(MISSING_CODE_OR_STATE)),
    }
}

/// `GET /api/auth/callback`: bounce the provider's redirect to the app entry.
pub async fn auth_callback(Query(params): Query<CallbackParams>) -> Redirect {
    debug!(
        has_code = params.code.is_some(),
        state = ?params.state,
        error = ?params.error,
        "OAuth callback received"
    );
    Redirect::temporary(&callback_location(&params))
}

/// `GET /`: hand callback parameters to a waiting CLI login.
pub async fn capture(
    State(state): State<GatewayState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(capture) = state.capture.as_ref() else {
        return Html(page::idle()).into_response();
    };
    if params.code.is_none() && params.error.is_none() {
        return Html(page::idle()).into_response();
    }

    let error = params.error.clone();
    if !capture.deliver(params).await {
        warn!("Callback arrived with no login waiting");
        return (StatusCode::CONFLICT, Html(page::failed("No login is waiting for this callback")))
            .into_response();
    }

    match error {
        Some(error) => Html(page::failed(&error)).into_response(),
        None => Html(page::signed_in()).into_response(),
    }
}

/// `POST /api/mcp`: forward a JSON-RPC message to an MCP endpoint.
pub async fn mcp_forward(
    State(state): State<GatewayState>,
    body: Bytes,
) -> GatewayResult<Response> {
    let body: Value = parse_body(&body)?;

    let endpoint = body
        .get("endpoint")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())
        .ok_or(GatewayError::BadRequest(MISSING_ENDPOINT))?;
    let mcp_request = body
        .get("mcpRequest")
        .filter(|r| !r.is_null())
        .ok_or(GatewayError::BadRequest(MISSING_MCP_REQUEST))?;

    let text = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let request = ForwardRequest {
        endpoint: endpoint.to_string(),
        access_token: text("accessToken"),
        mcp_request: mcp_request.clone(),
        session_id: text("sessionId"),
    };

    let reply = state.forwarder.forward(request).await?;
    if !reply.is_success() {
        return Err(GatewayError::Upstream {
            status: StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY),
            body: reply.body,
        });
    }
    Ok(Json(reply.body).into_response())
}
