//! Cooperative cancellation and bounded retry loops.
//!
//! Every background loop of a session is written in terms of these helpers,
//! so stopping the [`RunFlag`] ends all of them within one tick.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Shared running flag with prompt wake-up on stop.
#[derive(Debug)]
pub struct RunFlag {
    running: AtomicBool,
    notify: Notify,
}

impl RunFlag {
    /// Create a flag in the running state.
    pub fn start() -> Self {
        Self {
            running: AtomicBool::new(true),
            notify: Notify::new(),
        }
    }

    /// Clear the flag and wake every waiter.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether the session is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolve once the flag is cleared.
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `duration` unless stopped first. Returns whether still running.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stopped() => {}
        }
        self.is_running()
    }
}

/// How a bounded retry loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// An attempt reported success.
    Completed,
    /// The deadline passed first.
    DeadlineElapsed,
    /// The run flag was cleared.
    Cancelled,
}

/// Run `attempt` every `interval` until it returns true, `deadline` passes,
/// or `flag` is stopped.
///
/// The first attempt runs immediately.
pub async fn retry_with_deadline<F, Fut>(
    interval: Duration,
    deadline: Duration,
    flag: &RunFlag,
    mut attempt: F,
) -> RetryOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    loop {
        if !flag.is_running() {
            return RetryOutcome::Cancelled;
        }
        if attempt().await {
            return RetryOutcome::Completed;
        }
        let elapsed = started.elapsed();
        if elapsed >= deadline {
            return RetryOutcome::DeadlineElapsed;
        }
        if !flag.sleep(interval.min(deadline - elapsed)).await {
            return RetryOutcome::Cancelled;
        }
    }
}

/// Run `action` every `interval` until `flag` is stopped.
pub async fn repeat_every<F, Fut>(interval: Duration, flag: &RunFlag, mut action: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    while flag.is_running() {
        action().await;
        if !flag.sleep(interval).await {
            break;
        }
    }
}
