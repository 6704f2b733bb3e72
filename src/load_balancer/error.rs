//! Errors surfaced by selection and dispatch.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors from building or driving the balancer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalancerError {
    #[error("at least one downstream server must be configured")]
    NoServers,

    #[error("health check interval must be greater than zero")]
    ZeroHealthCheckInterval,

    /// Every server was unhealthy after a full rotation.
    #[error("No available server, try again later")]
    NoAvailableServer,

    #[error("health loop is already running")]
    HealthLoopAlreadyRunning,
}

/// Errors that end a dispatch without a downstream response.
///
/// Transport failures are not listed here: they are absorbed by failover
/// and only surface as `Unavailable` once no healthy server remains.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Unavailable(#[from] BalancerError),

    #[error("failed to read request body: {0}")]
    RequestBody(axum::Error),

    #[error("failed to build downstream request: {0}")]
    BuildRequest(#[from] axum::http::Error),

    #[error("failed to read response body from {destination}: {source}")]
    ResponseBody {
        destination: String,
        source: axum::Error,
    },

    #[error("timed out reading response body from {0}")]
    ResponseTimeout(String),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
