//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every downstream server
//! - Update each server's health flag from the probe outcome
//! - Stop on request, acknowledging the caller once no probe can still land

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::http::client::TimedClient;
use crate::load_balancer::downstream::DownstreamServer;
use crate::load_balancer::BalancerError;

const PROBE_USER_AGENT: &str = "downstream-balancer-health-check";

/// A stop request carries the channel the loop acknowledges on.
type StopRequest = oneshot::Sender<()>;

/// Ticker settings and stop handshake for one balancer's health loop.
#[derive(Debug)]
pub struct HealthLoop {
    client: TimedClient,
    interval: Duration,
    stop_tx: mpsc::Sender<StopRequest>,
    /// Held by the running loop; at most one loop owns it at a time.
    stop_rx: Mutex<mpsc::Receiver<StopRequest>>,
}

impl HealthLoop {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        Self {
            client: TimedClient::unpooled(timeout),
            interval,
            stop_tx,
            stop_rx: Mutex::new(stop_rx),
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_rx.try_lock().is_err()
    }

    /// Probe `servers` every interval until [`HealthLoop::stop`] is called.
    ///
    /// The first round fires one full interval after the call.
    pub async fn run(&self, servers: &[Arc<DownstreamServer>]) -> Result<(), BalancerError> {
        let mut stop_rx = self
            .stop_rx
            .try_lock()
            .map_err(|_| BalancerError::HealthLoopAlreadyRunning)?;

        tracing::info!(
            interval = ?self.interval,
            timeout = ?self.client.timeout(),
            servers = servers.len(),
            "Health loop starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut probes = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                request = stop_rx.recv() => {
                    // In-flight probes must not write a flag after we acknowledge.
                    probes.shutdown().await;
                    if let Some(ack) = request {
                        let _ = ack.send(());
                    }
                    tracing::info!("Health loop stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    for server in servers {
                        probes.spawn(probe(self.client.clone(), Arc::clone(server)));
                    }
                }
                Some(_) = probes.join_next(), if !probes.is_empty() => {}
            }
        }
    }

    /// Ask the running loop to stop and wait for its acknowledgement.
    ///
    /// If no loop is running this waits until one starts and consumes the
    /// request.
    pub async fn stop(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.stop_tx.send(ack_tx).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }
}

/// Probe one server and record the outcome.
///
/// Any response counts as healthy, whatever its status code; only a
/// transport failure (or an unusable probe URL) marks the server unhealthy.
async fn probe(client: TimedClient, server: Arc<DownstreamServer>) {
    let request = Request::get(server.health_check_address())
        .header(header::USER_AGENT, PROBE_USER_AGENT)
        .body(Body::empty());

    let outcome = match request {
        Ok(request) => client.send(request).await.map(drop).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok(()) => server.mark_healthy(),
        Err(error) => {
            server.mark_unhealthy();
            tracing::debug!(server = %server.health_check_address(), error = %error, "Health check failed");
        }
    }

    tracing::info!(
        server = %server.health_check_address(),
        healthy = server.is_healthy(),
        "HealthCheck"
    );
}
