//! One-shot broadcast completion signal.
//!
//! # Responsibilities
//! - Close exactly once; later closes are no-ops
//! - Wake every waiter on close
//! - Never block a waiter that arrives after the close
//!
//! # Design Decisions
//! - Backed by a `watch` channel holding a `bool`
//! - Producers hold a `Signal`, consumers hold a read-only `SignalListener`

use std::sync::Arc;
use tokio::sync::watch;

/// Producer side of a one-shot completion signal.
///
/// Cloning shares the same underlying signal.
#[derive(Debug, Clone)]
pub struct Signal {
    tx: Arc<watch::Sender<bool>>,
}

impl Signal {
    /// Create an open signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Close the signal.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    /// Whether the signal has been closed.
    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal closes. Returns immediately if it already has.
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the wait cannot fail.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Hand out a read-only view for external observers.
    pub fn listener(&self) -> SignalListener {
        SignalListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only side of a [`Signal`].
#[derive(Debug, Clone)]
pub struct SignalListener {
    rx: watch::Receiver<bool>,
}

impl SignalListener {
    /// Whether the signal has been closed.
    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the signal to close.
    ///
    /// Returns `false` if every producer went away without closing it.
    pub async fn wait(&mut self) -> bool {
        self.rx.wait_for(|closed| *closed).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_close_is_one_shot() {
        let signal = Signal::new();
        assert!(!signal.is_closed());
        assert!(signal.close());
        assert!(!signal.close());
        assert!(signal.is_closed());
    }

    #[tokio::test]
    async fn test_waiters_wake_on_close() {
        let signal = Signal::new();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let mut listener = signal.listener();
            handles.push(tokio::spawn(async move { listener.wait().await }));
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.close();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_late_waiter_does_not_block() {
        let signal = Signal::new();
        signal.close();

        let mut listener = signal.listener();
        let closed = tokio::time::timeout(Duration::from_millis(50), listener.wait())
            .await
            .expect("late waiter blocked");
        assert!(closed);

        tokio::time::timeout(Duration::from_millis(50), signal.closed())
            .await
            .expect("closed() blocked after close");
    }

    #[tokio::test]
    async fn test_listener_reports_abandoned_signal() {
        let signal = Signal::new();
        let mut listener = signal.listener();
        drop(signal);

        assert!(!listener.wait().await);
        assert!(!listener.is_closed());
    }
}
