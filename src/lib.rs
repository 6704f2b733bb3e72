//! Round-robin HTTP load balancer library

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::BalancerConfig;
pub use http::Server;
pub use lifecycle::Shutdown;
pub use load_balancer::{BalancerError, DispatchError, DownstreamServer, LoadBalancer};
