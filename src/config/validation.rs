//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject an empty downstream registry (fatal: the balancer must not serve)
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs after CLI overrides, before any subsystem is built

use axum::http::Uri;
use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no downstream servers were set")]
    NoServers,

    #[error("invalid downstream server address {address:?}: {reason}")]
    InvalidServerAddress { address: String, reason: String },

    #[error("downstream server {address:?} uses unsupported scheme {scheme:?} (only http is supported)")]
    UnsupportedScheme { address: String, scheme: String },

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Check a fully merged configuration.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_bind_address(&config.listener.bind_target()) {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.downstream.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    for address in &config.downstream.servers {
        match Url::parse(address) {
            Ok(url) if url.scheme() != "http" => errors.push(ValidationError::UnsupportedScheme {
                address: address.clone(),
                scheme: url.scheme().to_string(),
            }),
            Ok(url) if url.host().is_none() => errors.push(ValidationError::InvalidServerAddress {
                address: address.clone(),
                reason: "missing host".to_string(),
            }),
            // The dispatcher uses the address verbatim, so it must be a valid URI as given.
            Ok(_) => {
                if let Err(e) = address.parse::<Uri>() {
                    errors.push(ValidationError::InvalidServerAddress {
                        address: address.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            Err(e) => errors.push(ValidationError::InvalidServerAddress {
                address: address.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if config.downstream.request_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration("downstream.request_timeout_ms"));
    }
    if config.health_check.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration("health_check.timeout_ms"));
    }
    if config.health_check.interval_ms == 0 {
        errors.push(ValidationError::ZeroDuration("health_check.interval_ms"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a numeric port; the host may be a name or a bracketed IPv6 literal.
fn is_bind_address(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
