//! Background trial status polling.
//!
//! One poller per session. It fetches immediately, then on a fixed period,
//! and publishes the most recent status on a watch channel. Failed fetches
//! keep the previous value. Dropping the poller cancels the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::AuthApi;
use crate::models::TrialStatus;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3 * 60);
pub const MIN_INTERVAL: Duration = Duration::from_secs(2 * 60);
pub const MAX_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct TrialPoller {
    cancel: CancellationToken,
    status: watch::Receiver<Option<TrialStatus>>,
    handle: Option<JoinHandle<()>>,
}

impl TrialPoller {
    /// Start polling with `token`, sending `fingerprint` on each request.
    /// `interval` is clamped to [`MIN_INTERVAL`]..=[`MAX_INTERVAL`].
    pub fn spawn<A: AuthApi>(
        api: Arc<A>,
        token: String,
        fingerprint: String,
        interval: Duration,
    ) -> Self {
        let period = interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(None);

        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let result = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    r = api.trial_status(&token, &fingerprint) => r,
                };
                match result {
                    Ok(status) => {
                        tx.send_replace(Some(status));
                    }
                    Err(e) => debug!(error = %e, "trial status poll failed"),
                }
            }
            debug!("trial poller stopped");
        });

        Self {
            cancel,
            status: rx,
            handle: Some(handle),
        }
    }

    /// Receiver for status updates. `None` until the first successful fetch.
    pub fn subscribe(&self) -> watch::Receiver<Option<TrialStatus>> {
        self.status.clone()
    }

    pub fn latest(&self) -> Option<TrialStatus> {
        self.status.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel and wait for the task to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TrialPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
