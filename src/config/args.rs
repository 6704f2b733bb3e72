//! Command-line arguments.
//!
//! Every flag is optional so that a configuration file (or the schema
//! defaults) supplies whatever was not given on the command line.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::{BalancerConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "downstream-balancer")]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
pub struct Cli {
    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Load balancer server address [default: 0.0.0.0:80]
    #[arg(short, long)]
    pub address: Option<String>,

    /// Comma-separated list of downstream servers (e.g. http://0.0.0.0:8080,http://localhost:8081)
    #[arg(short, long)]
    pub servers: Option<String>,

    /// Request timeout for downstream servers in seconds [default: 10]
    #[arg(short, long)]
    pub request_timeout: Option<u64>,

    /// Health check timeout in seconds [default: 10]
    #[arg(short = 't', long)]
    pub health_check_timeout: Option<u64>,

    /// Downstream servers health check interval in seconds [default: 10]
    #[arg(short = 'i', long)]
    pub health_check_interval: Option<u64>,

    /// Health check endpoint (e.g "/health-check") [default: /]
    #[arg(short = 'u', long)]
    pub health_check_endpoint: Option<String>,

    /// Log level, overridden by RUST_LOG [default: info]
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format [default: text]
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Override `config` with every flag that was given.
    pub fn apply(&self, config: &mut BalancerConfig) {
        if let Some(address) = &self.address {
            config.listener.bind_address = address.clone();
        }
        if let Some(servers) = &self.servers {
            config.downstream.servers = servers.split(',').map(str::to_owned).collect();
        }
        if let Some(secs) = self.request_timeout {
            config.downstream.request_timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = self.health_check_timeout {
            config.health_check.timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = self.health_check_interval {
            config.health_check.interval_ms = secs.saturating_mul(1000);
        }
        if let Some(endpoint) = &self.health_check_endpoint {
            config.health_check.endpoint = endpoint.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }
}
