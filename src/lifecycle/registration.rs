//! Registration with the discovery registry once the service is ready.
//!
//! # Responsibilities
//! - Wait for the readiness gate
//! - Register the service identity exactly once
//! - Close the external "started" signal
//!
//! # Design Decisions
//! - Armed through `ReadinessGate::on_ready`, so it can never fire twice
//! - Shutdown only cancels the trigger while it still waits on the gate;
//!   once registration has begun it runs to completion, so the caller
//!   always learns whether the service ended up registered
//! - Under `FailurePolicy::Ignore` a failed registration is logged and the
//!   service is still announced as started; under `Fatal` it is not

use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::FailurePolicy;
use crate::discovery::{RegistryError, ServiceIdentity, ServiceRegistry};
use crate::lifecycle::gate::ReadinessGate;
use crate::lifecycle::shutdown::triggered;
use crate::lifecycle::signal::{Signal, SignalListener};
use crate::lifecycle::state::{BootstrapState, StateReporter};
use crate::observability::metrics;

/// How the trigger concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The registry accepted the service.
    Registered,
    /// The registry call failed and the failure was ignored.
    Failed,
    /// The gate was dropped before it became ready.
    NeverReady,
    /// Shutdown arrived before the gate became ready.
    Cancelled,
}

pub struct RegistrationTrigger {
    registry: Arc<dyn ServiceRegistry>,
    identity: ServiceIdentity,
    policy: FailurePolicy,
    started: Signal,
    state: StateReporter,
}

impl RegistrationTrigger {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        identity: ServiceIdentity,
        policy: FailurePolicy,
        started: Signal,
        state: StateReporter,
    ) -> Self {
        Self {
            registry,
            identity,
            policy,
            started,
            state,
        }
    }

    /// Hook the trigger onto `gate` and run it on a background task.
    ///
    /// The task resolves to `Cancelled` if `shutdown` fires first.
    pub fn arm(
        self,
        gate: &ReadinessGate,
        shutdown: SignalListener,
    ) -> JoinHandle<Result<Registration, RegistryError>> {
        let (ready_tx, ready_rx) = oneshot::channel();
        gate.on_ready(move || {
            let _ = ready_tx.send(());
        });

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = triggered(shutdown) => {
                    tracing::debug!("Shutdown before readiness, not registering");
                    Ok(Registration::Cancelled)
                }
                ready = ready_rx => match ready {
                    Ok(()) => self.fire().await,
                    Err(_) => Ok(Registration::NeverReady),
                },
            }
        })
    }

    async fn fire(self) -> Result<Registration, RegistryError> {
        self.state.set(BootstrapState::Gated);
        self.state.set(BootstrapState::Registering);

        let outcome = match self.registry.register(&self.identity).await {
            Ok(()) => {
                metrics::record_registration("success");
                Registration::Registered
            }
            Err(e) => {
                metrics::record_registration("failure");
                match self.policy {
                    FailurePolicy::Ignore => {
                        tracing::error!(
                            service_id = %self.identity.id,
                            error = %e,
                            "Service registration failed, continuing unregistered"
                        );
                        Registration::Failed
                    }
                    FailurePolicy::Fatal => {
                        tracing::error!(
                            service_id = %self.identity.id,
                            error = %e,
                            "Service registration failed"
                        );
                        return Err(e);
                    }
                }
            }
        };

        self.started.close();
        self.state.set(BootstrapState::Ready);
        tracing::info!(service = %self.identity.name, "Service started");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::lifecycle::gate::{REPLAY_COMPLETE, ROUTES_DEPLOYED};
    use crate::lifecycle::shutdown::Shutdown;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingRegistry {
        calls: AtomicUsize,
        reject: bool,
        delay: Duration,
    }

    #[async_trait]
    impl ServiceRegistry for CountingRegistry {
        async fn register(&self, _identity: &ServiceIdentity) -> Result<(), RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.reject {
                Err(RegistryError::Rejected {
                    status: 503,
                    body: "agent down".into(),
                })
            } else {
                Ok(())
            }
        }

        async fn deregister(&self, _identity: &ServiceIdentity) -> Result<(), RegistryError> {
            Ok(())
        }
    }

    fn make_trigger(
        registry: Arc<CountingRegistry>,
        policy: FailurePolicy,
    ) -> (RegistrationTrigger, Signal, StateReporter) {
        let identity = ServiceIdentity::from_config(&ServiceConfig::default()).unwrap();
        let started = Signal::new();
        let state = StateReporter::new();
        let trigger = RegistrationTrigger::new(
            registry,
            identity,
            policy,
            started.clone(),
            state.clone(),
        );
        (trigger, started, state)
    }

    #[tokio::test]
    async fn test_registers_once_in_either_order() {
        for order in [
            [REPLAY_COMPLETE, ROUTES_DEPLOYED],
            [ROUTES_DEPLOYED, REPLAY_COMPLETE],
        ] {
            let registry = Arc::new(CountingRegistry::default());
            let (trigger, started, state) = make_trigger(registry.clone(), FailurePolicy::Ignore);
            let gate = ReadinessGate::for_bootstrap();
            let handle = trigger.arm(&gate, Shutdown::new().subscribe());

            gate.complete(order[0]).unwrap();
            assert!(!started.is_closed());
            gate.complete(order[1]).unwrap();
            gate.complete(order[1]).unwrap();

            assert_eq!(handle.await.unwrap().unwrap(), Registration::Registered);
            assert!(started.is_closed());
            assert_eq!(state.current(), BootstrapState::Ready);
            assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_ignored_failure_still_starts() {
        let registry = Arc::new(CountingRegistry {
            reject: true,
            ..Default::default()
        });
        let (trigger, started, _) = make_trigger(registry.clone(), FailurePolicy::Ignore);
        let gate = ReadinessGate::new(["only"]);
        let handle = trigger.arm(&gate, Shutdown::new().subscribe());
        gate.complete("only").unwrap();

        assert_eq!(handle.await.unwrap().unwrap(), Registration::Failed);
        assert!(started.is_closed());
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fatal_failure_does_not_start() {
        let registry = Arc::new(CountingRegistry {
            reject: true,
            ..Default::default()
        });
        let (trigger, started, state) = make_trigger(registry, FailurePolicy::Fatal);
        let gate = ReadinessGate::new(["only"]);
        let handle = trigger.arm(&gate, Shutdown::new().subscribe());
        gate.complete("only").unwrap();

        assert!(matches!(
            handle.await.unwrap(),
            Err(RegistryError::Rejected { status: 503, .. })
        ));
        assert!(!started.is_closed());
        assert_eq!(state.current(), BootstrapState::Registering);
    }

    #[tokio::test]
    async fn test_dropped_gate_never_registers() {
        let registry = Arc::new(CountingRegistry::default());
        let (trigger, started, _) = make_trigger(registry.clone(), FailurePolicy::Ignore);
        let gate = ReadinessGate::for_bootstrap();
        let handle = trigger.arm(&gate, Shutdown::new().subscribe());
        gate.complete(ROUTES_DEPLOYED).unwrap();
        drop(gate);

        assert_eq!(handle.await.unwrap().unwrap(), Registration::NeverReady);
        assert!(!started.is_closed());
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_before_ready_cancels() {
        let registry = Arc::new(CountingRegistry::default());
        let (trigger, started, _) = make_trigger(registry.clone(), FailurePolicy::Ignore);
        let gate = ReadinessGate::for_bootstrap();
        let shutdown = Shutdown::new();
        let handle = trigger.arm(&gate, shutdown.subscribe());

        gate.complete(ROUTES_DEPLOYED).unwrap();
        shutdown.trigger();
        assert_eq!(handle.await.unwrap().unwrap(), Registration::Cancelled);

        gate.complete(REPLAY_COMPLETE).unwrap();
        assert!(!started.is_closed());
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registration_in_progress_survives_shutdown() {
        let registry = Arc::new(CountingRegistry {
            delay: Duration::from_millis(50),
            ..Default::default()
        });
        let (trigger, started, _) = make_trigger(registry.clone(), FailurePolicy::Ignore);
        let gate = ReadinessGate::new(["only"]);
        let shutdown = Shutdown::new();
        let handle = trigger.arm(&gate, shutdown.subscribe());

        gate.complete("only").unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
        shutdown.trigger();

        assert_eq!(handle.await.unwrap().unwrap(), Registration::Registered);
        assert!(started.is_closed());
    }
}
