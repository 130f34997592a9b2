//! Cooperative cancellation for watch sessions.
//!
//! A [`ShutdownSignal`] is the handle a caller uses to end a watch session:
//! clone one into [`Watcher::watch`](crate::Watcher::watch), keep the
//! original, and call [`trigger`](ShutdownSignal::trigger) when done. The
//! poll loop observes the signal at the top of every iteration, concurrently
//! with its timer.
//!
//! OS signal handling is deliberately absent; wiring a signal handler to
//! `trigger` is the embedding process's concern.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation handle for a watch session.
#[derive(Clone)]
pub struct ShutdownSignal {
    trigger_tx: Arc<watch::Sender<bool>>,
    triggered_rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Creates a new, untriggered signal.
    pub fn new() -> Self {
        let (trigger_tx, triggered_rx) = watch::channel(false);
        Self {
            trigger_tx: Arc::new(trigger_tx),
            triggered_rx,
        }
    }

    /// Triggers cancellation. Idempotent; all clones observe it.
    pub fn trigger(&self) {
        let _ = self.trigger_tx.send(true);
    }

    /// Checks whether cancellation has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.triggered_rx.borrow()
    }

    /// Waits until cancellation is triggered (for use in select! arms).
    pub async fn cancelled(&self) {
        let mut rx = self.triggered_rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_untriggered() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());
    }

    #[tokio::test]
    async fn trigger_is_observed_by_clones() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();

        signal.trigger();
        assert!(clone.is_triggered());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();

        signal.trigger();

        let result = tokio::time::timeout(Duration::from_millis(100), waiter.cancelled()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn cancelled_resolves_when_already_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        // Must not hang waiting for a change notification that already fired.
        let result = tokio::time::timeout(Duration::from_millis(100), signal.cancelled()).await;
        assert!(result.is_ok());
    }
}
