//! Background silent refresh.
//!
//! A [`TokenMonitor`] polls the credential store on a fixed interval and
//! refreshes the token set once it is within the look-ahead threshold of
//! expiring. Refresh failures are logged and retried on the next tick. The
//! monitor ends on its own once the tokens are gone or carry no refresh token.

use crate::flow::OAuthFlow;
use crate::types::OAuthConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Poll interval and look-ahead threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub threshold: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            threshold: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Tick {
    Continue,
    Stop,
}

/// Handle to a running monitor task. Dropping it stops the task.
pub struct TokenMonitor {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TokenMonitor {
    /// Spawn a monitor on the current tokio runtime. The first check runs
    /// one interval after spawning.
    pub fn spawn(flow: Arc<OAuthFlow>, config: OAuthConfig, settings: MonitorSettings) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            debug!(
                interval_secs = settings.interval.as_secs(),
                threshold_secs = settings.threshold.as_secs(),
                "Token monitor started"
            );
            let mut ticker =
                tokio::time::interval_at(Instant::now() + settings.interval, settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Token monitor cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        if check(&flow, &config, settings.threshold).await == Tick::Stop {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Ask the task to stop. Returns immediately.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop the task and wait for it to end.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Token monitor task failed");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for TokenMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn check(flow: &OAuthFlow, config: &OAuthConfig, threshold: Duration) -> Tick {
    let store = flow.store();
    let Some(tokens) = store.get_tokens().await else {
        debug!("No tokens stored, stopping token monitor");
        return Tick::Stop;
    };
    let Some(refresh_token) = tokens.refresh_token.as_deref() else {
        debug!("No refresh token, stopping token monitor");
        return Tick::Stop;
    };

    if !tokens.expires_within(store.now(), threshold) {
        return Tick::Continue;
    }

    info!("Token expiring soon, refreshing");
    if let Err(e) = flow.refresh_token(config, refresh_token).await {
        warn!(error = %e, "Silent token refresh failed");
    }
    Tick::Continue
}
