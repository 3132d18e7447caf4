//! Startup orchestration.
//!
//! # Responsibilities
//! - Start accepting requests immediately
//! - Run the self liveness probe and the replay wait side by side
//! - Feed both completions into the readiness gate
//! - Register with discovery and close "started" once the gate opens
//! - Stop everything on shutdown or on a fatal error
//!
//! # Design Decisions
//! - The listener is serving before the service is ready; readiness is
//!   announced only through the registry and the "started" signal
//! - Probe exhaustion is fatal: the server is stopped and `run` returns
//!   `BootstrapError::ProbeExhausted` without registering
//! - Shutdown before readiness leaves the gate as far as it got
//! - A registration that has started is awaited, never aborted, so a
//!   registered service is always deregistered on the way out

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;

use crate::config::ServiceConfig;
use crate::discovery::{RegistryError, ServiceIdentity, ServiceRegistry};
use crate::health::probe::{LivenessProbe, ProbeError};
use crate::http::HttpServer;
use crate::lifecycle::gate::{GateError, ReadinessGate, REPLAY_COMPLETE, ROUTES_DEPLOYED};
use crate::lifecycle::registration::{Registration, RegistrationTrigger};
use crate::lifecycle::shutdown::{triggered, Shutdown};
use crate::lifecycle::signal::{Signal, SignalListener};
use crate::lifecycle::state::{BootstrapState, StateReporter};
use crate::replay::{ReplayError, ReplayHandle};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
    #[error("the router did not respond after {attempts} attempts")]
    ProbeExhausted { attempts: u32 },
    #[error("liveness probe could not start: {0}")]
    ProbeClient(#[source] reqwest::Error),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("service registration failed: {0}")]
    Registration(#[from] RegistryError),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("bootstrap task failed: {0}")]
    Task(#[from] JoinError),
}

impl From<ProbeError> for BootstrapError {
    fn from(e: ProbeError) -> Self {
        match e {
            ProbeError::Exhausted { attempts } => BootstrapError::ProbeExhausted { attempts },
            ProbeError::Client(e) => BootstrapError::ProbeClient(e),
        }
    }
}

fn flatten<T>(joined: Result<Result<T, BootstrapError>, JoinError>) -> Result<T, BootstrapError> {
    joined?
}

/// Probe the router, then close `routes-deployed`.
async fn deploy_routes(probe: LivenessProbe, gate: Arc<ReadinessGate>) -> Result<u32, BootstrapError> {
    let attempts = probe.probe().await?;
    tracing::info!(attempts, "The router has been deployed successfully");
    gate.complete(ROUTES_DEPLOYED)?;
    Ok(attempts)
}

/// Wait for event replay, then close `replay-complete`.
async fn replay_events(replay: ReplayHandle, gate: Arc<ReadinessGate>) -> Result<u64, BootstrapError> {
    let events = replay.finished().await?;
    tracing::info!(events, "Events replayed");
    gate.complete(REPLAY_COMPLETE)?;
    Ok(events)
}

/// Bind the configured service address.
pub async fn bind(config: &ServiceConfig) -> Result<TcpListener, BootstrapError> {
    TcpListener::bind(&config.service.addr)
        .await
        .map_err(|source| BootstrapError::Bind {
            addr: config.service.addr.clone(),
            source,
        })
}

/// One bootstrap run of the service.
pub struct Bootstrap {
    config: Arc<ServiceConfig>,
    registry: Arc<dyn ServiceRegistry>,
    replay: ReplayHandle,
    metrics: Option<PrometheusHandle>,
    gate: Arc<ReadinessGate>,
    started: Signal,
    state: StateReporter,
}

impl Bootstrap {
    pub fn new(
        config: Arc<ServiceConfig>,
        registry: Arc<dyn ServiceRegistry>,
        replay: ReplayHandle,
    ) -> Self {
        Self {
            config,
            registry,
            replay,
            metrics: None,
            gate: Arc::new(ReadinessGate::for_bootstrap()),
            started: Signal::new(),
            state: StateReporter::new(),
        }
    }

    /// Serve `/metrics` from the given recorder.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// The external "started" signal: closes once the service is announced.
    pub fn started(&self) -> SignalListener {
        self.started.listener()
    }

    /// Watch bootstrap state transitions.
    pub fn state(&self) -> watch::Receiver<BootstrapState> {
        self.state.subscribe()
    }

    /// The readiness gate of this run.
    pub fn gate(&self) -> Arc<ReadinessGate> {
        self.gate.clone()
    }

    /// Drive the bootstrap until shutdown or a fatal error.
    ///
    /// Returns `Ok(())` after a graceful shutdown.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), BootstrapError> {
        let Bootstrap {
            config,
            registry,
            replay,
            metrics,
            gate,
            started,
            state,
        } = self;

        let identity = ServiceIdentity::from_config(&config)?;
        let probe = LivenessProbe::from_config(config.probe_target(), &config.probe)?;

        let server = HttpServer::new(config.clone(), started.listener(), metrics);
        let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));
        state.set(BootstrapState::Serving);

        let mut registration = RegistrationTrigger::new(
            registry.clone(),
            identity.clone(),
            config.discovery.failure_policy,
            started,
            state.clone(),
        )
        .arm(&gate, shutdown.subscribe());

        state.set(BootstrapState::Probing);
        tracing::info!(
            target_url = %probe.target(),
            max_attempts = config.probe.max_attempts,
            "Probing router"
        );
        let mut probe_task = tokio::spawn(deploy_routes(probe, gate.clone()));
        let mut replay_task = tokio::spawn(replay_events(replay, gate.clone()));

        let stop = triggered(shutdown.subscribe());
        tokio::pin!(stop);

        let mut probing = true;
        let mut replaying = true;
        let mut registering = true;
        let mut registered = false;
        let mut server_done = false;

        let outcome = loop {
            tokio::select! {
                joined = &mut probe_task, if probing => {
                    probing = false;
                    if let Err(e) = flatten(joined) {
                        if matches!(e, BootstrapError::ProbeExhausted { .. }) {
                            state.set(BootstrapState::FatalProbeFailure);
                            tracing::error!(
                                error = %e,
                                "The router has no response, or it took too long to start up"
                            );
                        }
                        break Err(e);
                    }
                }
                joined = &mut replay_task, if replaying => {
                    replaying = false;
                    if let Err(e) = flatten(joined) {
                        tracing::error!(error = %e, "Event replay failed");
                        break Err(e);
                    }
                }
                joined = &mut registration, if registering => {
                    registering = false;
                    match joined {
                        Ok(Ok(Registration::Registered)) => registered = true,
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => break Err(e.into()),
                        Err(e) => break Err(e.into()),
                    }
                }
                served = &mut server_task => {
                    server_done = true;
                    match served {
                        Ok(Ok(())) => break Ok(()),
                        Ok(Err(e)) => break Err(BootstrapError::Serve(e)),
                        Err(e) => break Err(e.into()),
                    }
                }
                _ = &mut stop => break Ok(()),
            }
        };

        // Neither task touches the gate after being aborted mid-await.
        probe_task.abort();
        replay_task.abort();

        if outcome.is_err() && state.current() != BootstrapState::FatalProbeFailure {
            state.set(BootstrapState::Failed);
        }
        shutdown.trigger();

        let grace = Duration::from_secs(config.timeouts.shutdown_secs);
        if registering {
            // The trigger stops on its own if the gate never opened; a
            // registration already underway is allowed to finish.
            match tokio::time::timeout(grace, &mut registration).await {
                Ok(Ok(Ok(Registration::Registered))) => registered = true,
                Ok(Ok(Ok(_))) => {}
                Ok(Ok(Err(e))) => tracing::warn!(error = %e, "Service registration failed during shutdown"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Registration task failed"),
                Err(_) => {
                    tracing::warn!(grace = ?grace, "Registration did not settle in time");
                    registration.abort();
                }
            }
        }

        if registered {
            if let Err(e) = registry.deregister(&identity).await {
                tracing::warn!(error = %e, "Service deregistration failed");
            }
        }

        if !server_done {
            match tokio::time::timeout(grace, &mut server_task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => tracing::warn!(error = %e, "HTTP server stopped with an error"),
                Ok(Err(e)) => tracing::warn!(error = %e, "HTTP server task failed"),
                Err(_) => {
                    tracing::warn!(grace = ?grace, "HTTP server did not drain in time");
                    server_task.abort();
                }
            }
        }

        if outcome.is_ok() {
            state.set(BootstrapState::Stopped);
        }
        outcome
    }
}
