//! Startup liveness probe.
//!
//! # Responsibilities
//! - Poll the service's own health route until it answers 200
//! - Give up after a fixed attempt budget
//!
//! # Design Decisions
//! - Any status other than 200 counts the same as a connection error
//! - Fixed interval between attempts, no sleep after the last one
//! - A budget of zero fails without sending a request
//! - Exhaustion is returned to the caller; the orchestrator decides policy

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::config::ProbeConfig;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot connect to the router after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("failed to build probe client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result of a single health check round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(String),
}

/// One health check round. Discarded once the probe concludes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub sequence: u32,
    pub outcome: AttemptOutcome,
    pub exhausted: bool,
}

/// Bounded-retry HTTP health check.
#[derive(Debug, Clone)]
pub struct LivenessProbe {
    client: reqwest::Client,
    target: String,
    max_attempts: u32,
    interval: Duration,
}

impl LivenessProbe {
    /// Create a probe against `target`.
    pub fn new(
        target: impl Into<String>,
        max_attempts: u32,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            target: target.into(),
            max_attempts,
            interval,
        })
    }

    /// Create a probe from config.
    pub fn from_config(target: impl Into<String>, config: &ProbeConfig) -> Result<Self, ProbeError> {
        Self::new(target, config.max_attempts, config.interval(), config.timeout())
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Poll the target until it answers 200 or the budget runs out.
    ///
    /// Returns the number of attempts it took.
    pub async fn probe(&self) -> Result<u32, ProbeError> {
        for sequence in 1..=self.max_attempts {
            let attempt = self.attempt(sequence).await;
            match attempt.outcome {
                AttemptOutcome::Success => {
                    metrics::record_probe_attempt("success");
                    tracing::info!(
                        target_url = %self.target,
                        attempts = sequence,
                        "Router responded to liveness probe"
                    );
                    return Ok(sequence);
                }
                AttemptOutcome::Failure(reason) => {
                    metrics::record_probe_attempt("failure");
                    if attempt.exhausted {
                        tracing::warn!(
                            target_url = %self.target,
                            attempt = sequence,
                            reason = %reason,
                            "Liveness probe failed, no attempts left"
                        );
                        break;
                    }
                    tracing::info!(
                        target_url = %self.target,
                        attempt = sequence,
                        max_attempts = self.max_attempts,
                        reason = %reason,
                        retry_in = ?self.interval,
                        "Waiting for the router"
                    );
                    tokio::time::sleep(self.interval).await;
                }
            }
        }

        Err(ProbeError::Exhausted {
            attempts: self.max_attempts,
        })
    }

    async fn attempt(&self, sequence: u32) -> ProbeAttempt {
        let outcome = match self.client.get(&self.target).send().await {
            Ok(response) if response.status() == StatusCode::OK => AttemptOutcome::Success,
            Ok(response) => AttemptOutcome::Failure(format!("status {}", response.status())),
            Err(e) => AttemptOutcome::Failure(e.to_string()),
        };
        ProbeAttempt {
            sequence,
            exhausted: outcome != AttemptOutcome::Success && sequence >= self.max_attempts,
            outcome,
        }
    }
}
