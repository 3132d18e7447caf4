//! Service bootstrap daemon.
//!
//! # Startup Sequence
//!
//! ```text
//!   ┌────────┐   ┌─────────┐   ┌───────────────┐
//!   │ config │──▶│  bind   │──▶│ serve (/sd/*) │◀──────────┐
//!   └────────┘   └─────────┘   └───────────────┘           │ GET /sd/health
//!                                                          │
//!                  ┌──────────────────┐   ┌─────────────────────┐
//!                  │  replay events   │   │   liveness probe    │
//!                  └────────┬─────────┘   └──────────┬──────────┘
//!                           │ replay-complete        │ routes-deployed
//!                           ▼                        ▼
//!                        ┌──────────────────────────────┐
//!                        │        readiness gate        │
//!                        └──────────────┬───────────────┘
//!                                       ▼
//!                        ┌──────────────────────────────┐
//!                        │ register with consul, start  │
//!                        └──────────────────────────────┘
//! ```

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use kitsvc::config::Cli;
use kitsvc::discovery::registry_from_config;
use kitsvc::lifecycle::{bind, signals, Bootstrap, Shutdown};
use kitsvc::observability::{logging::init_logging, metrics::init_metrics};
use kitsvc::replay::ReplayHandle;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("kitsvc: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("kitsvc: failed to initialize logging: {e}");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "kitsvc starting");
    tracing::info!(
        name = %config.service.name,
        addr = %config.service.addr,
        url = %config.service.url,
        probe_target = %config.probe_target(),
        max_attempts = config.probe.max_attempts,
        discovery = config.discovery.enabled,
        "Configuration loaded"
    );

    let metrics = if config.observability.metrics_enabled {
        init_metrics()
    } else {
        None
    };

    let registry = match registry_from_config(&config.discovery) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create discovery client");
            return ExitCode::FAILURE;
        }
    };

    let listener = match bind(&config).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    // No event store is wired into this binary, so there is nothing to replay.
    let replay = ReplayHandle::completed();

    let mut bootstrap = Bootstrap::new(Arc::new(config), registry, replay);
    if let Some(handle) = metrics {
        bootstrap = bootstrap.with_metrics(handle);
    }

    let shutdown = Shutdown::new();
    signals::spawn_handler(shutdown.clone());

    match bootstrap.run(listener, shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Service terminated");
            ExitCode::FAILURE
        }
    }
}
