//! Sign-in command handlers.

use crate::context::App;
use anyhow::{bail, Context};
use chrono::{DateTime, Local, Utc};
use mcpscope_auth::{CallbackOutcome, OAuthConfig, TokenSet};
use mcpscope_gateway::{CallbackCapture, GatewayState};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

/// How long `login` waits for the browser to come back.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Run the authorization code flow through the browser.
pub async fn login(app: &App, no_browser: bool) -> anyhow::Result<()> {
    let config = app.oauth()?.clone();
    config.validate()?;
    let addr = callback_addr(&config)?;

    let listener = mcpscope_gateway::bind(addr)
        .await
        .with_context(|| format!("Could not listen for the OAuth callback on {addr}"))?;
    let (capture, callback) = CallbackCapture::channel();
    let state = GatewayState::new(app.config.gateway.client_secret.clone()).with_capture(capture);
    let shutdown = CancellationToken::new();
    let server = tokio::spawn(mcpscope_gateway::serve(listener, state, shutdown.clone()));

    let request = app.flow.begin_authorization(&config).await?;
    println!("Opening the browser to sign in. If it does not open, visit:");
    println!();
    println!("  {}", request.url);
    println!();
    if !no_browser {
        if let Err(e) = open::that(&request.url) {
            warn!(error = %e, "Failed to open browser");
        }
    }

    let params = tokio::time::timeout(LOGIN_TIMEOUT, callback).await;
    shutdown.cancel();
    if let Ok(Err(e)) = server.await {
        warn!(error = %e, "Callback listener failed");
    }

    let params = match params {
        Ok(Ok(params)) => params,
        Ok(Err(_)) => bail!("Callback listener stopped before the provider redirected back"),
        Err(_) => bail!("Timed out waiting for authorization"),
    };

    match app.flow.handle_callback(params).await? {
        CallbackOutcome::Authenticated(tokens) => {
            println!("✓ Signed in{}", identity_suffix(&tokens));
            println!("  Token expires {}", format_expiry(tokens.expires_at));
        }
        CallbackOutcome::AlreadyProcessed => {
            println!("This authorization code was already used.");
        }
    }
    Ok(())
}

/// The local address the redirect URI points at.
fn callback_addr(config: &OAuthConfig) -> anyhow::Result<SocketAddr> {
    let redirect = Url::parse(&config.redirect_uri)
        .with_context(|| format!("Invalid redirect URI: {}", config.redirect_uri))?;
    let host = redirect.host_str().unwrap_or_default();
    if !matches!(host, "localhost" | "127.0.0.1" | "[::1]") {
        bail!("Redirect URI must point at this machine for CLI login, got {host}");
    }
    let port = redirect
        .port_or_known_default()
        .context("Redirect URI has no port")?;
    let ip: std::net::IpAddr = if host == "[::1]" {
        std::net::Ipv6Addr::LOCALHOST.into()
    } else {
        std::net::Ipv4Addr::LOCALHOST.into()
    };
    Ok(SocketAddr::new(ip, port))
}

pub async fn logout(app: &App) -> anyhow::Result<()> {
    app.flow.sign_out().await?;
    println!("✓ Signed out");
    Ok(())
}

pub async fn status(app: &App) -> anyhow::Result<()> {
    let Some(tokens) = app.store.get_tokens().await else {
        println!("Not signed in.");
        return Ok(());
    };

    let now = app.store.now();
    let who = tokens.user_display.as_deref().unwrap_or("unknown user");
    if tokens.is_expired_at(now) {
        println!("Signed in as {who}, but the token expired {}.", format_expiry(tokens.expires_at));
        if tokens.refresh_token.is_some() {
            println!("Run `mcpscope refresh` to renew it.");
        }
        return Ok(());
    }

    let remaining = tokens.time_until_expiry_at(now);
    println!("Signed in as {who}");
    println!("  Expires:   {}", format_expiry(tokens.expires_at));
    println!("  Remaining: {}", format_remaining(remaining));
    println!(
        "  Refresh:   {}",
        if tokens.refresh_token.is_some() { "available" } else { "none" }
    );
    Ok(())
}

pub async fn refresh(app: &App) -> anyhow::Result<()> {
    let config = app.oauth()?;
    let tokens = app.flow.refresh_current(config).await?;
    println!("✓ Token refreshed{}", identity_suffix(&tokens));
    println!("  Expires {}", format_expiry(tokens.expires_at));
    Ok(())
}

fn identity_suffix(tokens: &TokenSet) -> String {
    tokens
        .user_display
        .as_deref()
        .map(|who| format!(" as {who}"))
        .unwrap_or_default()
}

fn format_expiry(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn format_remaining(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}
