//! HTTP server setup and graceful shutdown.
//!
//! # Responsibilities
//! - Create an Axum Router whose fallback dispatches every method and path
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener
//! - Run the health loop alongside the listener
//! - Stop the health loop, then drain the listener, under a deadline

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::time;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::lifecycle::shutdown::{self, Shutdown};
use crate::load_balancer::LoadBalancer;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Listener wrapper around a [`LoadBalancer`].
pub struct Server {
    address: String,
    balancer: Arc<LoadBalancer>,
    shutdown: Shutdown,
}

impl Server {
    pub fn new(address: impl Into<String>, balancer: Arc<LoadBalancer>) -> Self {
        Self {
            address: address.into(),
            balancer,
            shutdown: Shutdown::new(),
        }
    }

    pub fn balancer(&self) -> &Arc<LoadBalancer> {
        &self.balancer
    }

    /// Bind the configured address and serve until shut down.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.address)
            .await
            .map_err(|source| ServerError::Bind {
                address: self.address.clone(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shut down.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Starting Load Balancer server");

        let balancer = Arc::clone(&self.balancer);
        let health = tokio::spawn(async move {
            if let Err(error) = balancer.start_health_loop().await {
                tracing::warn!(error = %error, "Health loop not started");
            }
        });

        let app = router(Arc::clone(&self.balancer))
            .into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::requested(self.shutdown.subscribe()))
            .await;

        // No probe may outlive the listener, whichever way serving ended.
        health.abort();
        let _ = health.await;

        self.shutdown.complete();
        tracing::info!("HTTP server stopped");
        result.map_err(ServerError::Serve)
    }

    /// Wait for `signal`, then stop the health loop and drain the listener.
    ///
    /// The whole sequence is bounded by `deadline`. A failure is logged and
    /// otherwise ignored.
    pub async fn graceful_shutdown<F>(&self, signal: F, deadline: Duration)
    where
        F: Future<Output = ()>,
    {
        signal.await;
        let started = Instant::now();

        if time::timeout(deadline, self.balancer.stop_health_loop())
            .await
            .is_err()
        {
            tracing::warn!(deadline = ?deadline, "Health loop did not acknowledge stop");
        }

        self.shutdown.trigger();
        let remaining = deadline.saturating_sub(started.elapsed());
        match time::timeout(remaining, self.shutdown.wait_for_completion()).await {
            Ok(()) => tracing::info!("Graceful shutdown completed"),
            Err(_) => tracing::error!(
                deadline = ?deadline,
                error = "in-flight requests did not finish before the deadline",
                "Graceful shutdown failed"
            ),
        }
    }
}

/// Build the router; every method and path goes to [`dispatch_handler`].
pub fn router(balancer: Arc<LoadBalancer>) -> Router {
    Router::new()
        .fallback(dispatch_handler)
        .with_state(balancer)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn dispatch_handler(
    State(balancer): State<Arc<LoadBalancer>>,
    request: Request<Body>,
) -> Response {
    let origin = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    match balancer.dispatch(request, origin).await {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(error = %error, "Dispatch failed");
            error.into_response()
        }
    }
}
