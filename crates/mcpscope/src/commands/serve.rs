//! Run the gateway as a standalone service.

use crate::context::App;
use anyhow::Context;
use mcpscope_gateway::GatewayState;
use std::net::{IpAddr, SocketAddr};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn serve(app: &App, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| app.config.gateway_host().to_string());
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid listen address: {host}"))?;
    let addr = SocketAddr::new(ip, port.unwrap_or_else(|| app.config.gateway_port()));

    let listener = mcpscope_gateway::bind(addr).await?;
    let state = GatewayState::new(app.config.gateway.client_secret.clone());
    if state.token_client.is_confidential() {
        info!("Client secret configured, token requests use HTTP Basic authentication");
    } else {
        warn!("No client secret configured, acting as a public client");
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
        }
        signal.cancel();
    });

    println!("Gateway listening on http://{addr}");
    mcpscope_gateway::serve(listener, state, shutdown).await?;
    Ok(())
}
