//! Downstream server abstraction.
//!
//! # Responsibilities
//! - Represent a single downstream server
//! - Derive its health-check URL once at construction
//! - Track health state (Healthy/Unhealthy) shared between probes and dispatch

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A single downstream server.
#[derive(Debug)]
pub struct DownstreamServer {
    /// Base URL requests are forwarded to.
    address: String,
    /// `address` followed by the health-check endpoint suffix.
    health_check_address: String,
    /// Written by health probes and failed dispatches, read by selection.
    healthy: AtomicBool,
}

impl DownstreamServer {
    /// Create a new downstream server, initially healthy.
    ///
    /// The health-check address is a plain concatenation; no slash
    /// deduplication is performed.
    pub fn new(address: impl Into<String>, endpoint: &str) -> Self {
        let address = address.into();
        let health_check_address = format!("{}{}", address, endpoint);
        Self {
            address,
            health_check_address,
            healthy: AtomicBool::new(true),
        }
    }

    /// Build the registry from a comma-separated address list.
    /// Order is preserved and defines round-robin order.
    pub fn from_csv(addresses: &str, endpoint: &str) -> Vec<Arc<Self>> {
        Self::from_addresses(addresses.split(','), endpoint)
    }

    /// Build the registry from an already split address list.
    pub fn from_addresses<I>(addresses: I, endpoint: &str) -> Vec<Arc<Self>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        addresses
            .into_iter()
            .map(|address| Arc::new(Self::new(address.as_ref(), endpoint)))
            .collect()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn health_check_address(&self) -> &str {
        &self.health_check_address
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn mark_healthy(&self) {
        self.healthy.store(true, Ordering::Release);
    }

    pub fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_check_address_is_concatenated() {
        let cases = [
            ("http://localhost", "/", "http://localhost/"),
            ("http://localhost:80", "/", "http://localhost:80/"),
            ("http://localhost:80", "/test", "http://localhost:80/test"),
            ("http://localhost:80", "/health/check", "http://localhost:80/health/check"),
            ("http://localhost:80/", "/health", "http://localhost:80//health"),
        ];

        for (address, endpoint, want) in cases {
            let server = DownstreamServer::new(address, endpoint);
            assert_eq!(server.health_check_address(), want);
            assert_eq!(server.address(), address);
            assert!(server.is_healthy());
        }
    }

    #[test]
    fn marks_are_idempotent() {
        let server = DownstreamServer::new("http://localhost:8081", "/");

        server.mark_unhealthy();
        server.mark_unhealthy();
        assert!(!server.is_healthy());

        server.mark_healthy();
        server.mark_healthy();
        assert!(server.is_healthy());
    }

    #[test]
    fn csv_preserves_order() {
        let servers = DownstreamServer::from_csv("server1,server2,server3", "/health");
        let addresses: Vec<_> = servers.iter().map(|s| s.address()).collect();
        assert_eq!(addresses, ["server1", "server2", "server3"]);
        assert_eq!(servers[2].health_check_address(), "server3/health");
    }
}
