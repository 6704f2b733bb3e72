//! Round-robin HTTP load balancer
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │               LOAD BALANCER                  │
//!                         │                                              │
//!     Client Request      │  ┌──────────┐    ┌──────────────────────┐    │
//!     ────────────────────┼─▶│  http    │───▶│ load_balancer        │    │
//!                         │  │  server  │    │ dispatch + failover  │────┼──▶ Downstream
//!     Client Response     │  │          │◀───│ round-robin select   │◀───┼─── Servers
//!     ◀───────────────────┼──│          │    └──────────▲───────────┘    │
//!                         │  └──────────┘               │ health flags   │
//!                         │                  ┌──────────┴───────────┐    │
//!                         │                  │ health loop (ticker) │────┼──▶ Probes
//!                         │                  └──────────────────────┘    │
//!                         │  config · observability · lifecycle          │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use downstream_balancer::config::{self, BalancerConfig, Cli};
use downstream_balancer::lifecycle::signals::shutdown_signal;
use downstream_balancer::observability::logging;
use downstream_balancer::{LoadBalancer, Server};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match config::load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => BalancerConfig::default(),
    };
    cli.apply(&mut config);

    if let Err(errors) = config::validate_config(&config) {
        eprintln!("{}", config::ConfigError::Validation(errors));
        eprintln!("Run with --help for usage.");
        return ExitCode::FAILURE;
    }

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Load balancer terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: BalancerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        servers = ?config.downstream.servers,
        health_check_endpoint = %config.health_check.endpoint,
        request_timeout_ms = config.downstream.request_timeout_ms,
        health_check_timeout_ms = config.health_check.timeout_ms,
        health_check_interval_ms = config.health_check.interval_ms,
        "Configuration loaded"
    );

    let balancer = Arc::new(LoadBalancer::from_config(&config)?);
    let server = Arc::new(Server::new(config.listener.bind_target(), balancer));

    let mut serving = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.start().await })
    };

    tokio::select! {
        result = &mut serving => {
            // The listener ended on its own: bind or accept failure.
            result??;
        }
        _ = server.graceful_shutdown(shutdown_signal(), config.lifecycle.shutdown_deadline()) => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
