//! Event replay completion.
//!
//! # Responsibilities
//! - Give the bootstrap a single "replay finished" notification
//! - Carry the outcome of a replay run by an `EventReplayer`
//!
//! # Design Decisions
//! - The handle is consumed by waiting on it, so it fires at most once
//! - A notifier dropped without reporting counts as a failed replay
//! - How events are stored and applied is left to the replayer

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("event replay failed: {0}")]
    Failed(String),
    #[error("event replay was abandoned before completing")]
    Abandoned,
}

/// Rebuilds local state from previously recorded events.
#[async_trait]
pub trait EventReplayer: Send + Sync + 'static {
    /// Replay every recorded event. Returns how many were applied.
    async fn replay(&self) -> Result<u64, ReplayError>;
}

/// Producer side of a [`ReplayHandle`].
#[derive(Debug)]
pub struct ReplayNotifier {
    tx: oneshot::Sender<Result<u64, ReplayError>>,
}

impl ReplayNotifier {
    /// Report that replay finished after applying `events` events.
    pub fn finished(self, events: u64) {
        let _ = self.tx.send(Ok(events));
    }

    /// Report that replay failed.
    pub fn failed(self, error: ReplayError) {
        let _ = self.tx.send(Err(error));
    }
}

/// One-shot "replay finished" notification.
#[derive(Debug)]
pub struct ReplayHandle {
    rx: oneshot::Receiver<Result<u64, ReplayError>>,
}

impl ReplayHandle {
    /// Create a notifier/handle pair.
    pub fn channel() -> (ReplayNotifier, ReplayHandle) {
        let (tx, rx) = oneshot::channel();
        (ReplayNotifier { tx }, ReplayHandle { rx })
    }

    /// A handle that has already finished, for services without an event store.
    pub fn completed() -> Self {
        let (notifier, handle) = Self::channel();
        notifier.finished(0);
        handle
    }

    /// Run `replayer` on a background task and report when it finishes.
    pub fn spawn<R: EventReplayer>(replayer: R) -> Self {
        let (notifier, handle) = Self::channel();
        tokio::spawn(async move {
            match replayer.replay().await {
                Ok(events) => notifier.finished(events),
                Err(e) => notifier.failed(e),
            }
        });
        handle
    }

    /// Wait for the replay to finish. Returns the number of replayed events.
    pub async fn finished(self) -> Result<u64, ReplayError> {
        self.rx.await.unwrap_or(Err(ReplayError::Abandoned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FixedReplayer(Result<u64, ReplayError>);

    #[async_trait]
    impl EventReplayer for FixedReplayer {
        async fn replay(&self) -> Result<u64, ReplayError> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_completed_handle() {
        assert_eq!(ReplayHandle::completed().finished().await, Ok(0));
    }

    #[tokio::test]
    async fn test_notifier_reports_count() {
        let (notifier, handle) = ReplayHandle::channel();
        tokio::spawn(async move { notifier.finished(42) });
        assert_eq!(handle.finished().await, Ok(42));
    }

    #[tokio::test]
    async fn test_dropped_notifier_is_abandoned() {
        let (notifier, handle) = ReplayHandle::channel();
        drop(notifier);
        assert_eq!(handle.finished().await, Err(ReplayError::Abandoned));
    }

    #[tokio::test]
    async fn test_spawned_replayer() {
        let ok = ReplayHandle::spawn(FixedReplayer(Ok(7)));
        assert_eq!(ok.finished().await, Ok(7));

        let failed = ReplayHandle::spawn(FixedReplayer(Err(ReplayError::Failed("corrupt".into()))));
        assert_eq!(
            failed.finished().await,
            Err(ReplayError::Failed("corrupt".into()))
        );
    }
}
