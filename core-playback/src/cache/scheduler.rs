//! Fixed-interval background task tied to a cancellation token

use crate::error::{PlaybackError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs a tick function on a fixed interval until cancelled.
///
/// Ticks never overlap: each tick is awaited before the interval is polled
/// again, and an overrunning tick pushes the next one back instead of
/// triggering a burst. Cancellation is only observed between ticks, so a tick
/// that has started always runs to completion.
///
/// Dropping the task cancels it.
pub struct ScheduledTask {
    name: &'static str,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Spawn with a fresh cancellation token.
    pub fn spawn<F, Fut>(name: &'static str, interval: Duration, tick: F) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_with_token(name, interval, CancellationToken::new(), tick)
    }

    /// Spawn tied to `token`, typically a child of the session token.
    ///
    /// # Errors
    /// `InvalidConfig` for a zero interval.
    pub fn spawn_with_token<F, Fut>(
        name: &'static str,
        interval: Duration,
        token: CancellationToken,
        mut tick: F,
    ) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if interval.is_zero() {
            return Err(PlaybackError::InvalidConfig(format!(
                "{} interval must be greater than 0",
                name
            )));
        }

        let loop_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u64 = 0;

            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tick().await;
                ticks += 1;
            }

            debug!(task = name, ticks, "Scheduled task stopped");
        });

        info!(task = name, ?interval, "Scheduled task started");
        Ok(Self {
            name,
            token,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Token observed by the task loop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request a stop without waiting for it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    /// Cancel and wait for any in-flight tick to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        self.token.cancel();
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        handle.await.map_err(|e| {
            warn!(task = self.name, error = %e, "Scheduled task ended abnormally");
            PlaybackError::Cache(format!("{} task failed: {}", self.name, e))
        })
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
