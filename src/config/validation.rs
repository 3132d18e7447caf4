//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check addresses and URLs parse
//! - Validate value ranges (intervals and timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{parse_duration, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn check_http_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme `{}`", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid url: {e}"))),
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.addr.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "service.addr",
            format!("`{}` is not a socket address", config.service.addr),
        ));
    }
    check_http_url("service.url", &config.service.url, &mut errors);

    if !config.probe.path.starts_with('/') {
        errors.push(ValidationError::new("probe.path", "must start with `/`"));
    }
    if config.probe.interval_ms == 0 {
        errors.push(ValidationError::new("probe.interval_ms", "must be > 0"));
    }
    if config.probe.timeout_ms == 0 {
        errors.push(ValidationError::new("probe.timeout_ms", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.discovery.enabled {
        if config.service.name.trim().is_empty() {
            errors.push(ValidationError::new(
                "service.name",
                "required when discovery is enabled",
            ));
        }
        check_http_url(
            "discovery.consul_address",
            &config.discovery.consul_address,
            &mut errors,
        );
        if parse_duration(&config.discovery.check_interval).is_none() {
            errors.push(ValidationError::new(
                "discovery.check_interval",
                format!("`{}` is not a duration", config.discovery.check_interval),
            ));
        }
        if parse_duration(&config.discovery.check_timeout).is_none() {
            errors.push(ValidationError::new(
                "discovery.check_timeout",
                format!("`{}` is not a duration", config.discovery.check_timeout),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_zero_attempts_is_allowed() {
        let mut config = ServiceConfig::default();
        config.probe.max_attempts = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.service.addr = "localhost".into();
        config.service.url = "ftp://example.com".into();
        config.service.name = " ".into();
        config.probe.path = "sd/health".into();
        config.probe.interval_ms = 0;
        config.discovery.check_interval = "often".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "service.addr",
                "service.url",
                "probe.path",
                "probe.interval_ms",
                "service.name",
                "discovery.check_interval",
            ]
        );
    }

    #[test]
    fn test_discovery_fields_ignored_when_disabled() {
        let mut config = ServiceConfig::default();
        config.discovery.enabled = false;
        config.service.name = String::new();
        config.discovery.consul_address = "not a url".into();
        assert!(validate_config(&config).is_ok());
    }
}
