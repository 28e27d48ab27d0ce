//! Router assembly and serving.

use crate::error::{GatewayError, GatewayResult};
use crate::routes;
use crate::state::GatewayState;
use axum::routing::{get, post};
use axum::Router;
use mcpscope_auth::TOKEN_ROUTE;
use mcpscope_mcp::MCP_ROUTE;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Span};

/// Path the provider redirects back to.
pub const CALLBACK_ROUTE: &str = "/api/auth/callback";

/// Build the gateway router.
///
/// `GET /` is only routed when the state carries a callback capture.
pub fn create_router(state: GatewayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(routes::health))
        .route(
            TOKEN_ROUTE,
            post(routes::token_exchange).put(routes::token_refresh),
        )
        .route(CALLBACK_ROUTE, get(routes::auth_callback))
        .route(MCP_ROUTE, post(routes::mcp_forward));

    if state.capture.is_some() {
        router = router.route("/", get(routes::capture));
    }

    router.with_state(state).layer(cors).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            })
            .on_response(
                |response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                    info!(status = %response.status(), latency = ?latency, "response");
                },
            ),
    )
}

/// Bind the gateway listener.
pub async fn bind(addr: SocketAddr) -> GatewayResult<TcpListener> {
    TcpListener::bind(addr).await.map_err(GatewayError::Bind)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: CancellationToken,
) -> GatewayResult<()> {
    let addr = listener.local_addr().map_err(GatewayError::Serve)?;
    info!(%addr, capture = state.capture.is_some(), "Gateway listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(GatewayError::Serve)?;

    info!("Gateway stopped");
    Ok(())
}
