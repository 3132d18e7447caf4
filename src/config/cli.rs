//! Command-line and environment overrides.
//!
//! Every flag can also be set through a `KITSVC_*` environment variable.
//! Flags override the config file; the merged result is revalidated.

use clap::Parser;
use std::path::PathBuf;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ServiceConfig;
use crate::config::validation::validate_config;

#[derive(Debug, Default, Parser)]
#[command(name = "kitsvc")]
#[command(version, about = "Starts the service daemon.", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long, env = "KITSVC_CONFIG")]
    pub config: Option<PathBuf>,

    /// The name of the service, exposed for service discovery.
    #[arg(long, env = "KITSVC_NAME")]
    pub name: Option<String>,

    /// The url of the service.
    #[arg(long, env = "KITSVC_URL")]
    pub url: Option<String>,

    /// The address of the service (with the port).
    #[arg(long, env = "KITSVC_ADDR")]
    pub addr: Option<String>,

    /// The usage of the service, exposed for service discovery.
    #[arg(long, env = "KITSVC_USAGE")]
    pub usage: Option<String>,

    /// How many times to ping the router before giving up.
    #[arg(long, env = "KITSVC_MAX_PING_COUNT")]
    pub max_ping_count: Option<u32>,

    /// Base URL of the Consul agent.
    #[arg(long, env = "KITSVC_CONSUL_ADDRESS")]
    pub consul_address: Option<String>,

    /// The interval of the consul health check.
    #[arg(long, env = "KITSVC_CONSUL_CHECK_INTERVAL")]
    pub consul_check_interval: Option<String>,

    /// The timeout of the consul health check.
    #[arg(long, env = "KITSVC_CONSUL_CHECK_TIMEOUT")]
    pub consul_check_timeout: Option<String>,

    /// The service tags for consul.
    #[arg(long, env = "KITSVC_CONSUL_TAGS", value_delimiter = ',')]
    pub consul_tags: Option<Vec<String>>,

    /// Disable service discovery registration.
    #[arg(long, env = "KITSVC_NO_DISCOVERY")]
    pub no_discovery: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "KITSVC_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Load the config file (or defaults) and apply the overrides.
    pub fn resolve(&self) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServiceConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Apply every override that was given.
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(name) = &self.name {
            config.service.name = name.clone();
        }
        if let Some(url) = &self.url {
            config.service.url = url.clone();
        }
        if let Some(addr) = &self.addr {
            config.service.addr = addr.clone();
        }
        if let Some(usage) = &self.usage {
            config.service.usage = usage.clone();
        }
        if let Some(count) = self.max_ping_count {
            config.probe.max_attempts = count;
        }
        if let Some(address) = &self.consul_address {
            config.discovery.consul_address = address.clone();
        }
        if let Some(interval) = &self.consul_check_interval {
            config.discovery.check_interval = interval.clone();
        }
        if let Some(timeout) = &self.consul_check_timeout {
            config.discovery.check_timeout = timeout.clone();
        }
        if let Some(tags) = &self.consul_tags {
            config.discovery.tags = tags.clone();
        }
        if self.no_discovery {
            config.discovery.enabled = false;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}
