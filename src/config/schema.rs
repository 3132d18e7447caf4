//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service identity and bind address.
    pub service: ServiceSection,

    /// Startup liveness probe settings.
    pub probe: ProbeConfig,

    /// Service discovery registration.
    pub discovery: DiscoveryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServiceConfig {
    /// URL the liveness probe polls: the service's own health route.
    pub fn probe_target(&self) -> String {
        format!("{}{}", self.service.url.trim_end_matches('/'), self.probe.path)
    }
}

/// Service identity, exposed for service discovery.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceSection {
    /// Name of the service.
    pub name: String,

    /// Externally reachable URL of the service.
    pub url: String,

    /// Bind address with port (e.g., "127.0.0.1:8080").
    pub addr: String,

    /// Human readable usage text.
    pub usage: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: "kitsvc".to_string(),
            url: "http://127.0.0.1:8080".to_string(),
            addr: "127.0.0.1:8080".to_string(),
            usage: String::new(),
        }
    }
}

/// Startup liveness probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Health route polled on the service itself.
    pub path: String,

    /// Attempt budget. Zero fails the probe without a request.
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub interval_ms: u64,

    /// Per-attempt request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            path: "/sd/health".to_string(),
            max_attempts: 20,
            interval_ms: 1000,
            timeout_ms: 1000,
        }
    }
}

/// What to do when registering with the discovery agent fails.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and announce the service as started anyway.
    #[default]
    Ignore,
    /// Abort the bootstrap without announcing the service.
    Fatal,
}

/// Service discovery (Consul agent) configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Register with the discovery agent once ready.
    pub enabled: bool,

    /// Base URL of the Consul agent HTTP API.
    pub consul_address: String,

    /// Interval of the agent's health check (e.g., "10s").
    pub check_interval: String,

    /// Timeout of the agent's health check (e.g., "1s").
    pub check_timeout: String,

    /// Service tags.
    pub tags: Vec<String>,

    /// Handling of registration failures.
    pub failure_policy: FailurePolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            consul_address: "http://127.0.0.1:8500".to_string(),
            check_interval: "10s".to_string(),
            check_timeout: "1s".to_string(),
            tags: vec!["micro".to_string()],
            failure_policy: FailurePolicy::Ignore,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,

    /// Upper bound on graceful shutdown in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on `/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}

/// Parse a Go-style duration string such as "500ms", "10s" or "1m".
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = value.split_at(value.find(|c: char| !c.is_ascii_digit())?);
    let amount: u64 = digits.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount.checked_mul(60)?)),
        _ => None,
    }
}
