//! Service discovery registration.
//!
//! # Responsibilities
//! - Describe the service to the registry (`ServiceIdentity`)
//! - Register once the service is ready, deregister on shutdown
//!
//! # Design Decisions
//! - The registry is a trait so the bootstrap can be driven without Consul
//! - Registration is attempted once; no retry loop here

pub mod consul;
pub mod identity;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::DiscoveryConfig;

pub use consul::ConsulRegistry;
pub use identity::{HealthCheckSpec, ServiceIdentity};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("registry rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid service identity: {0}")]
    InvalidIdentity(String),
}

/// Discovery registry the service announces itself to.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn register(&self, identity: &ServiceIdentity) -> Result<(), RegistryError>;

    async fn deregister(&self, identity: &ServiceIdentity) -> Result<(), RegistryError>;
}

/// Registry used when discovery is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistry;

#[async_trait]
impl ServiceRegistry for NoopRegistry {
    async fn register(&self, identity: &ServiceIdentity) -> Result<(), RegistryError> {
        tracing::info!(service_id = %identity.id, "Discovery disabled, skipping registration");
        Ok(())
    }

    async fn deregister(&self, _identity: &ServiceIdentity) -> Result<(), RegistryError> {
        Ok(())
    }
}

/// Pick the registry implementation for the given config.
pub fn registry_from_config(
    config: &DiscoveryConfig,
) -> Result<Arc<dyn ServiceRegistry>, RegistryError> {
    if config.enabled {
        Ok(Arc::new(ConsulRegistry::new(config.consul_address.clone())?))
    } else {
        Ok(Arc::new(NoopRegistry))
    }
}
