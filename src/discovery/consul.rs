//! Consul agent registration over its HTTP API.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::discovery::{RegistryError, ServiceIdentity, ServiceRegistry};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    address: &'a str,
    port: u16,
    tags: &'a [String],
    meta: HashMap<&'static str, &'a str>,
    check: AgentServiceCheck<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceCheck<'a> {
    #[serde(rename = "HTTP")]
    http: &'a str,
    interval: &'a str,
    timeout: &'a str,
}

impl<'a> From<&'a ServiceIdentity> for AgentServiceRegistration<'a> {
    fn from(identity: &'a ServiceIdentity) -> Self {
        let mut meta = HashMap::new();
        meta.insert("url", identity.url.as_str());
        if !identity.usage.is_empty() {
            meta.insert("usage", identity.usage.as_str());
        }
        Self {
            id: &identity.id,
            name: &identity.name,
            address: &identity.address,
            port: identity.port,
            tags: &identity.tags,
            meta,
            check: AgentServiceCheck {
                http: &identity.check.http,
                interval: &identity.check.interval,
                timeout: &identity.check.timeout,
            },
        }
    }
}

/// Registers the service with a local Consul agent.
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl ConsulRegistry {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn put(&self, path: &str, body: Option<&AgentServiceRegistration<'_>>) -> Result<(), RegistryError> {
        let mut request = self.client.put(format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ServiceRegistry for ConsulRegistry {
    async fn register(&self, identity: &ServiceIdentity) -> Result<(), RegistryError> {
        let payload = AgentServiceRegistration::from(identity);
        self.put("/v1/agent/service/register", Some(&payload)).await?;
        tracing::info!(
            service_id = %identity.id,
            consul = %self.base_url,
            "Registered with consul"
        );
        Ok(())
    }

    async fn deregister(&self, identity: &ServiceIdentity) -> Result<(), RegistryError> {
        self.put(&format!("/v1/agent/service/deregister/{}", identity.id), None)
            .await?;
        tracing::info!(service_id = %identity.id, "Deregistered from consul");
        Ok(())
    }
}
