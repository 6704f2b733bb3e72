//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri},
    Router,
};
use downstream_balancer::http::ServerError;
use downstream_balancer::load_balancer::BalancerSettings;
use downstream_balancer::{DownstreamServer, LoadBalancer, Server};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A backend bound to an ephemeral port. Stops accepting when stopped or dropped.
pub struct MockBackend {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Drop the listener; new connections are refused afterwards.
    pub async fn stop(&self) {
        self.handle.abort();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve `router` on an ephemeral port.
pub async fn start_backend(router: Router) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    MockBackend { addr, handle }
}

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(response: &'static str) -> MockBackend {
    start_backend(Router::new().fallback(move || async move { response })).await
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    start_backend(Router::new().fallback(move || {
        let f = f.clone();
        async move {
            let (status, body) = f().await;
            (StatusCode::from_u16(status).unwrap(), body)
        }
    }))
    .await
}

/// Start a backend that answers `"<METHOD> <path?query> <body>"` and echoes
/// selected request headers back as `x-seen-*` response headers.
pub async fn start_echo_backend() -> MockBackend {
    start_backend(Router::new().fallback(
        |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| async move {
            let mut echoed = HeaderMap::new();
            for (name, seen) in [
                ("x-request-id", "x-seen-request-id"),
                ("x-forwarded-for", "x-seen-forwarded-for"),
            ] {
                if let Some(value) = headers.get(name) {
                    echoed.insert(seen, value.clone());
                }
            }
            let text = format!("{} {} {}", method, uri, String::from_utf8_lossy(&body));
            (echoed, text)
        },
    ))
    .await
}

/// Start a backend that records the path of every request it receives.
pub async fn start_recording_backend() -> (MockBackend, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let backend = start_backend(Router::new().fallback(move |uri: Uri| {
        let recorder = Arc::clone(&recorder);
        async move {
            recorder.lock().unwrap().push(uri.path().to_string());
            "recorded"
        }
    }))
    .await;
    (backend, seen)
}

/// Start a backend that accepts connections but never answers.
pub async fn start_silent_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    MockBackend { addr, handle }
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Settings with short timeouts; `interval` controls the health loop.
pub fn settings(interval: Duration) -> BalancerSettings {
    BalancerSettings {
        request_timeout: Duration::from_millis(500),
        health_check_timeout: Duration::from_millis(200),
        health_check_interval: interval,
        ..BalancerSettings::default()
    }
}

/// Interval long enough that no probe fires during a test.
pub const NO_PROBES: Duration = Duration::from_secs(3600);

/// A balancer serving on an ephemeral port.
pub struct RunningBalancer {
    pub addr: SocketAddr,
    pub server: Arc<Server>,
    pub serving: JoinHandle<Result<(), ServerError>>,
}

impl RunningBalancer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn balancer(&self) -> &Arc<LoadBalancer> {
        self.server.balancer()
    }
}

/// Start a balancer over `servers` with the `/` health endpoint.
pub async fn start_balancer(servers: &[String], settings: BalancerSettings) -> RunningBalancer {
    let registry = DownstreamServer::from_addresses(servers, "/");
    let balancer = Arc::new(LoadBalancer::new(registry, settings).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(Server::new(addr.to_string(), balancer));

    let serving = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve(listener).await })
    };

    // Wait for the health loop task to take its control state.
    for _ in 0..100 {
        if server.balancer().is_health_loop_running() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    RunningBalancer {
        addr,
        server,
        serving,
    }
}

/// Client without connection reuse or system proxy settings.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
