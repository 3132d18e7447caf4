//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kitsvc_probe_attempts_total` (counter): liveness probe attempts by outcome
//! - `kitsvc_bootstrap_state` (gauge): numeric bootstrap state
//! - `kitsvc_registrations_total` (counter): discovery registrations by outcome
//! - `kitsvc_http_requests_total` (counter): requests by method, status
//! - `kitsvc_http_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed
//! - The Prometheus text is served from the service's own router

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus recorder.
///
/// Returns `None` when a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            tracing::info!("Prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Metrics recorder not installed");
            None
        }
    }
}

pub fn record_probe_attempt(outcome: &'static str) {
    counter!("kitsvc_probe_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_bootstrap_state(state: u8) {
    gauge!("kitsvc_bootstrap_state").set(f64::from(state));
}

pub fn record_registration(outcome: &'static str) {
    counter!("kitsvc_registrations_total", "outcome" => outcome).increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "kitsvc_http_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "kitsvc_http_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}
