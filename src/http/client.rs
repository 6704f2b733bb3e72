//! Outbound HTTP client with a fixed per-call deadline.
//!
//! The balancer keeps two of these: one for forwarded requests and one for
//! health probes, each with its own timeout.

use std::fmt;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::time;

/// Transport-level failure of an outbound call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
}

#[derive(Clone)]
pub struct TimedClient {
    inner: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl TimedClient {
    /// Pooled client, used for forwarding.
    pub fn new(timeout: Duration) -> Self {
        let inner = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { inner, timeout }
    }

    /// Client that opens a fresh connection per call, used for probes so a
    /// kept-alive connection cannot mask a server that stopped accepting.
    pub fn unpooled(timeout: Duration) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request`, failing if response headers do not arrive in time.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, ClientError> {
        match time::timeout(self.timeout, self.inner.request(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ClientError::Transport(e)),
            Err(_) => Err(ClientError::Timeout(self.timeout)),
        }
    }
}

impl fmt::Debug for TimedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
