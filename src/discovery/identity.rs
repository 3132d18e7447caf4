//! Registration payload handed to the discovery agent.

use url::Url;

use crate::config::ServiceConfig;
use crate::discovery::RegistryError;

/// Health check the discovery agent runs against the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckSpec {
    pub http: String,
    pub interval: String,
    pub timeout: String,
}

/// Externally visible identity of the service. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub url: String,
    pub usage: String,
    pub tags: Vec<String>,
    pub check: HealthCheckSpec,
}

impl ServiceIdentity {
    /// Build the identity from the service config.
    ///
    /// Address and port come from the public `service.url`, not the bind
    /// address, so a service bound to 0.0.0.0 registers a reachable host.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, RegistryError> {
        let url = Url::parse(&config.service.url)
            .map_err(|e| RegistryError::InvalidIdentity(format!("service.url: {e}")))?;
        let address = url
            .host_str()
            .ok_or_else(|| RegistryError::InvalidIdentity("service.url has no host".into()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| RegistryError::InvalidIdentity("service.url has no port".into()))?;

        Ok(Self {
            id: format!("{}-{}-{}", config.service.name, address, port),
            name: config.service.name.clone(),
            address,
            port,
            url: config.service.url.clone(),
            usage: config.service.usage.clone(),
            tags: config.discovery.tags.clone(),
            check: HealthCheckSpec {
                http: config.probe_target(),
                interval: config.discovery.check_interval.clone(),
                timeout: config.discovery.check_timeout.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_config() {
        let mut config = ServiceConfig::default();
        config.service.name = "user".into();
        config.service.url = "http://10.1.2.3:9000".into();
        config.service.usage = "user accounts".into();

        let identity = ServiceIdentity::from_config(&config).unwrap();
        assert_eq!(identity.id, "user-10.1.2.3-9000");
        assert_eq!(identity.address, "10.1.2.3");
        assert_eq!(identity.port, 9000);
        assert_eq!(identity.tags, vec!["micro".to_string()]);
        assert_eq!(identity.check.http, "http://10.1.2.3:9000/sd/health");
        assert_eq!(identity.check.interval, "10s");
    }

    #[test]
    fn test_default_port_from_scheme() {
        let mut config = ServiceConfig::default();
        config.service.url = "https://svc.example.com".into();
        let identity = ServiceIdentity::from_config(&config).unwrap();
        assert_eq!(identity.port, 443);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = ServiceConfig::default();
        config.service.url = "not a url".into();
        assert!(matches!(
            ServiceIdentity::from_config(&config),
            Err(RegistryError::InvalidIdentity(_))
        ));
    }
}
