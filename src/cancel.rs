//! Cooperative cancellation for export runs.
//!
//! Every export run owns a fresh [`CancellationSignal`]. The orchestrator hands
//! it to each suspension point (courtesy delay, retry backoff, network fetch)
//! so that raising it interrupts whatever the run is currently waiting on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Shared handle to a cancellation signal.
pub type SharedCancellation = Arc<CancellationSignal>;

/// Write-once, read-many cancellation flag with async notification.
#[derive(Debug, Default)]
pub struct CancellationSignal {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationSignal {
    /// Create a signal that has not been raised.
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Create a new shared signal wrapped in [`Arc`].
    pub fn shared() -> SharedCancellation {
        Arc::new(Self::new())
    }

    /// Raise the signal. Waiters are notified exactly once; later calls are no-ops.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether the signal has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the signal is raised. Returns immediately if already raised.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register interest before checking the flag so a concurrent cancel()
        // between the check and the await cannot be missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Sleep for `duration` unless the signal fires first.
    ///
    /// Returns `true` when the full duration elapsed and `false` when the
    /// sleep was cut short by cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}
