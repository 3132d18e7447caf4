//! Shutdown coordination for the service.

use crate::lifecycle::signal::{Signal, SignalListener};

/// Coordinator for graceful shutdown.
///
/// Every long-running task (accept loop, liveness probe, replay wait)
/// subscribes and stops when the coordinator is triggered. Subscribers
/// created after the trigger see it immediately.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    signal: Signal,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> SignalListener {
        self.signal.listener()
    }

    /// Trigger the shutdown signal. Repeated triggers are ignored.
    pub fn trigger(&self) {
        if self.signal.close() {
            tracing::info!("Shutdown triggered");
        }
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.signal.is_closed()
    }
}

/// Wait until a subscription fires.
///
/// A coordinator dropped without triggering never resolves, so a dropped
/// `Shutdown` does not tear down the tasks it was handed to.
pub async fn triggered(mut listener: SignalListener) {
    if !listener.wait().await {
        std::future::pending::<()>().await;
    }
}
