//! The balancer: registry, round-robin selection and health-loop control.
//!
//! Dispatch lives in `dispatch.rs`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::BalancerConfig;
use crate::health::active::HealthLoop;
use crate::http::client::TimedClient;
use crate::load_balancer::downstream::DownstreamServer;
use crate::load_balancer::BalancerError;

/// Timeouts and limits the balancer is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalancerSettings {
    pub request_timeout: Duration,
    pub health_check_timeout: Duration,
    pub health_check_interval: Duration,
    pub max_body_bytes: usize,
}

impl Default for BalancerSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            health_check_timeout: Duration::from_secs(10),
            health_check_interval: Duration::from_secs(10),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl From<&BalancerConfig> for BalancerSettings {
    fn from(config: &BalancerConfig) -> Self {
        Self {
            request_timeout: config.downstream.request_timeout(),
            health_check_timeout: config.health_check.timeout(),
            health_check_interval: config.health_check.interval(),
            max_body_bytes: config.listener.max_body_bytes,
        }
    }
}

/// Round-robin load balancer over a fixed registry of downstream servers.
#[derive(Debug)]
pub struct LoadBalancer {
    /// Shared selection counter; only its value modulo the registry size matters.
    counter: AtomicU64,
    servers: Vec<Arc<DownstreamServer>>,
    pub(crate) downstream_client: TimedClient,
    pub(crate) max_body_bytes: usize,
    health: HealthLoop,
}

impl LoadBalancer {
    /// Create a balancer over `servers`, in round-robin order.
    pub fn new(
        servers: Vec<Arc<DownstreamServer>>,
        settings: BalancerSettings,
    ) -> Result<Self, BalancerError> {
        if servers.is_empty() {
            return Err(BalancerError::NoServers);
        }
        if settings.health_check_interval.is_zero() {
            return Err(BalancerError::ZeroHealthCheckInterval);
        }

        Ok(Self {
            counter: AtomicU64::new(0),
            servers,
            downstream_client: TimedClient::new(settings.request_timeout),
            max_body_bytes: settings.max_body_bytes,
            health: HealthLoop::new(
                settings.health_check_interval,
                settings.health_check_timeout,
            ),
        })
    }

    /// Build the registry and balancer from a validated configuration.
    pub fn from_config(config: &BalancerConfig) -> Result<Self, BalancerError> {
        let servers = DownstreamServer::from_addresses(
            &config.downstream.servers,
            &config.health_check.endpoint,
        );
        Self::new(servers, BalancerSettings::from(config))
    }

    pub fn servers(&self) -> &[Arc<DownstreamServer>] {
        &self.servers
    }

    /// Next server in rotation, healthy or not.
    pub fn select_next(&self) -> Arc<DownstreamServer> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let index = (n % self.servers.len() as u64) as usize;
        Arc::clone(&self.servers[index])
    }

    /// Next healthy server in rotation.
    ///
    /// Makes at most one full rotation (`N` selections) before giving up.
    pub fn select_healthy(&self) -> Result<Arc<DownstreamServer>, BalancerError> {
        for _ in 0..self.servers.len() {
            let server = self.select_next();
            if server.is_healthy() {
                return Ok(server);
            }
        }
        tracing::debug!(servers = self.servers.len(), "No healthy downstream server found");
        Err(BalancerError::NoAvailableServer)
    }

    /// Run the health loop until [`LoadBalancer::stop_health_loop`] is called.
    pub async fn start_health_loop(&self) -> Result<(), BalancerError> {
        self.health.run(&self.servers).await
    }

    /// Stop the running health loop and wait until it has acknowledged.
    ///
    /// Callers must make sure a loop is running; otherwise this waits for
    /// one to start.
    pub async fn stop_health_loop(&self) {
        self.health.stop().await
    }

    pub fn is_health_loop_running(&self) -> bool {
        self.health.is_running()
    }
}
