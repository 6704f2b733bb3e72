//! Request dispatch with failover.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → buffer body
//!     → select_healthy() ──(none)──▶ 500 NoAvailableServer
//!     → build outbound request (method, headers, path, query, body)
//!     → send ──(transport failure)──▶ mark unhealthy, select again
//!     → buffer response body
//!     → relay status, headers, body
//! ```
//!
//! # Design Decisions
//! - Only transport failures count against a server; 4xx/5xx are relayed as-is
//! - Bodies are buffered both ways, so a 500 can always replace a response
//!   that failed half way
//! - Hop-by-hop headers, including those named in `Connection`, are dropped
//!   in both directions

use std::net::SocketAddr;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, request, HeaderMap, HeaderName, HeaderValue, Request, Response};
use tokio::time;

use crate::load_balancer::balancer::LoadBalancer;
use crate::load_balancer::downstream::DownstreamServer;
use crate::load_balancer::DispatchError;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Connection-scoped headers that must not be forwarded by a proxy.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

impl LoadBalancer {
    /// Forward `request` to a healthy downstream and relay its response.
    ///
    /// `origin` is the client's socket address, when known.
    pub async fn dispatch(
        &self,
        request: Request<Body>,
        origin: Option<SocketAddr>,
    ) -> Result<Response<Body>, DispatchError> {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, self.max_body_bytes)
            .await
            .map_err(DispatchError::RequestBody)?;

        loop {
            let server = self.select_healthy()?;
            let outbound = build_request(&server, &parts, origin, body.clone())?;

            let response = match self.downstream_client.send(outbound).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::warn!(
                        destination = %server.address(),
                        error = %error,
                        "Downstream request failed, marking server unhealthy"
                    );
                    server.mark_unhealthy();
                    continue;
                }
            };

            let (response_parts, response_body) = response.into_parts();
            let bytes = match time::timeout(
                self.downstream_client.timeout(),
                to_bytes(Body::new(response_body), usize::MAX),
            )
            .await
            {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(source)) => {
                    return Err(DispatchError::ResponseBody {
                        destination: server.address().to_string(),
                        source,
                    })
                }
                Err(_) => {
                    return Err(DispatchError::ResponseTimeout(server.address().to_string()))
                }
            };

            log_request(&server, &parts, origin);

            let mut relayed = Response::new(Body::from(bytes));
            *relayed.status_mut() = response_parts.status;
            copy_end_to_end(&response_parts.headers, relayed.headers_mut());
            return Ok(relayed);
        }
    }
}

/// Build the request sent to `server`.
///
/// The target is the server's base address followed by the inbound path and
/// query string.
fn build_request(
    server: &DownstreamServer,
    parts: &request::Parts,
    origin: Option<SocketAddr>,
    body: Bytes,
) -> Result<Request<Body>, DispatchError> {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("{}{}", server.address().trim_end_matches('/'), path_and_query);

    let mut builder = Request::builder()
        .method(parts.method.clone())
        .uri(target);

    if let Some(headers) = builder.headers_mut() {
        copy_end_to_end(&parts.headers, headers);
        if let Some(origin) = origin {
            let forwarded = match parts.headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(prior) => format!("{}, {}", prior, origin.ip()),
                None => origin.ip().to_string(),
            };
            if let Ok(value) = HeaderValue::from_str(&forwarded) {
                headers.insert(X_FORWARDED_FOR, value);
            }
        }
    }

    Ok(builder.body(Body::from(body))?)
}

/// Copy `from` into `to`, minus the fixed hop-by-hop set and any header
/// named in `Connection`.
fn copy_end_to_end(from: &HeaderMap, to: &mut HeaderMap) {
    let listed: Vec<HeaderName> = from
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for (name, value) in from {
        if !HOP_BY_HOP.contains(name) && !listed.contains(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> &str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

fn log_request(server: &DownstreamServer, parts: &request::Parts, origin: Option<SocketAddr>) {
    let host = match header_str(&parts.headers, header::HOST) {
        "" => parts.uri.host().unwrap_or(""),
        host => host,
    };

    tracing::info!(
        origin = %origin.map(|o| o.to_string()).unwrap_or_default(),
        method = %parts.method,
        url = %parts.uri,
        host = %host,
        user_agent = %header_str(&parts.headers, header::USER_AGENT),
        destination = %server.address(),
        "Request"
    );
}
