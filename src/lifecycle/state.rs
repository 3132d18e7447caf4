//! Bootstrap state machine.
//!
//! ```text
//! Starting → Serving → Probing → Gated → Registering → Ready → Stopped
//!                         │
//!                         └→ FatalProbeFailure
//! ```
//!
//! `Probing` covers the liveness probe and the replay wait running side by
//! side. `Failed` is any other fatal error (replay, registration, serve).

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::observability::metrics;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Starting = 0,
    Serving = 1,
    Probing = 2,
    Gated = 3,
    Registering = 4,
    Ready = 5,
    Stopped = 6,
    FatalProbeFailure = 7,
    Failed = 8,
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapState::Starting => "starting",
            BootstrapState::Serving => "serving",
            BootstrapState::Probing => "probing",
            BootstrapState::Gated => "gated",
            BootstrapState::Registering => "registering",
            BootstrapState::Ready => "ready",
            BootstrapState::Stopped => "stopped",
            BootstrapState::FatalProbeFailure => "fatal-probe-failure",
            BootstrapState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Publishes bootstrap state transitions to watchers, logs and metrics.
#[derive(Debug, Clone)]
pub struct StateReporter {
    tx: Arc<watch::Sender<BootstrapState>>,
}

impl StateReporter {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(BootstrapState::Starting);
        metrics::record_bootstrap_state(BootstrapState::Starting as u8);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, state: BootstrapState) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Bootstrap state changed");
            metrics::record_bootstrap_state(state as u8);
        }
    }

    pub fn current(&self) -> BootstrapState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BootstrapState> {
        self.tx.subscribe()
    }
}

impl Default for StateReporter {
    fn default() -> Self {
        Self::new()
    }
}
